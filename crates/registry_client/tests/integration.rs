use ans_api::*;
use ans_registry_client::*;
use ans_test_utils::{enable_tracing, random_agent_id};
use ans_test_utils::record::*;
use ans_test_utils::registry::TestRegistrySrv;

fn client(srv: &TestRegistrySrv) -> RegistryClient {
    RegistryClient::with_server_url(&srv.url()).unwrap()
}

#[test]
fn register_reference_record() {
    enable_tracing();

    let srv = TestRegistrySrv::new().unwrap();
    let (_kp, record) = signed_example();

    let body = client(&srv).blocking_register(&record).unwrap();
    assert_eq!(r#"{"status":"registered"}"#, body);

    assert_eq!(
        Some("application/json"),
        srv.last_register_content_type().as_deref()
    );

    // wire format: snake case fields, camel case proof
    let sent: serde_json::Value =
        serde_json::from_str(&srv.last_register_body().unwrap()).unwrap();
    assert_eq!("my-smart-agent.ans", sent["agent_id"]);
    assert_eq!("https://smartai.test.com/a2a", sent["endpoints"]["a2a"]);
    assert!(sent["proofOfOwnership"]["signature"].is_string());
    assert!(sent["proofOfOwnership"]["timestamp"]
        .as_str()
        .unwrap()
        .ends_with('Z'));

    assert_eq!(vec![record], srv.registered());
}

#[test]
fn success_body_is_returned_verbatim() {
    enable_tracing();

    let srv = TestRegistrySrv::new().unwrap();
    srv.force_response(201, "created, thanks");

    let (_kp, record) = signed_example();
    let body = client(&srv).blocking_register(&record).unwrap();
    assert_eq!("created, thanks", body);
}

#[test]
fn duplicate_registration_is_rejected() {
    enable_tracing();

    let srv = TestRegistrySrv::new().unwrap();
    let c = client(&srv);
    let (_kp, record) = signed_example();

    c.blocking_register(&record).unwrap();
    let err = c.blocking_register(&record).unwrap_err();

    match &err {
        AnsError::RegistrationRejected {
            status,
            status_text,
            body,
        } => {
            assert_eq!(409, *status);
            assert_eq!("Conflict", &**status_text);
            assert_eq!(r#"{"error":"duplicate agent_id"}"#, &**body);
        }
        oth => panic!("unexpected {oth:?}"),
    }
    assert_eq!(
        r#"registration rejected: 409 Conflict: {"error":"duplicate agent_id"}"#,
        err.to_string()
    );
}

#[test]
fn tampered_record_is_rejected() {
    enable_tracing();

    let srv = TestRegistrySrv::new().unwrap();
    let (_kp, record) = signed_example();
    let tampered = record
        .to_builder()
        .description("An agent that can do anything")
        .build()
        .with_proof(record.proof_of_ownership().unwrap().clone());

    let err = client(&srv).blocking_register(&tampered).unwrap_err();
    assert_eq!(Some(401), err.status());
    assert!(err.body().unwrap().contains("Invalid proof"), "{err}");
    assert!(srv.registered().is_empty());
}

#[test]
fn unsigned_record_never_leaves_the_client() {
    enable_tracing();

    let srv = TestRegistrySrv::new().unwrap();
    let record = example_record("PEM");

    let err = client(&srv).blocking_register(&record).unwrap_err();
    assert!(matches!(err, AnsError::Unsigned { .. }), "{err}");
    assert_eq!(0, srv.register_calls());
}

#[test]
fn unreachable_registry_is_a_transport_error() {
    enable_tracing();

    let url = {
        let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        format!("http://{:?}", l.local_addr().unwrap())
    };

    let (_kp, record) = signed_example();
    let c = RegistryClient::with_server_url(&url).unwrap();

    let err = c.blocking_register(&record).unwrap_err();
    assert!(matches!(err, AnsError::Transport { .. }), "{err}");

    let err = c.blocking_lookup(&LookupQuery::default()).unwrap_err();
    assert!(matches!(err, AnsError::Transport { .. }), "{err}");
}

#[test]
fn path_prefix_is_kept() {
    enable_tracing();

    let srv = TestRegistrySrv::new().unwrap();
    let (_kp, record) = signed_example();

    // the test registry only serves the root, so a prefix yields a 404
    let c =
        RegistryClient::with_server_url(&format!("{}/ans/v1", srv.url()))
            .unwrap();
    let err = c.blocking_register(&record).unwrap_err();
    assert_eq!(Some(404), err.status());

    let c = RegistryClient::with_server_url(&format!("{}/", srv.url()))
        .unwrap();
    c.blocking_register(&record).unwrap();
}

#[test]
fn lookup_by_agent_id() {
    enable_tracing();

    let srv = TestRegistrySrv::new().unwrap();
    let c = client(&srv);
    let (kp, record) = signed_example();
    c.blocking_register(&record).unwrap();

    let res = c
        .blocking_lookup(&LookupQuery::by_agent_id("my-smart-agent.ans"))
        .unwrap();

    assert_eq!("success", res.status);
    assert_eq!(1, res.total_matches);
    assert!(!res.has_next_page());

    let found = &res.results[0];
    assert_eq!("my-smart-agent.ans", found.agent_id);
    assert!(found.did.starts_with("did:ans:"), "{}", found.did);
    assert_eq!("My Smart AI Agent", found.name);
    assert_eq!(kp.public_key_pem().unwrap(), found.public_key);
    assert_eq!(record.endpoints(), &found.endpoints);
    assert_eq!("provisional", found.verification.level);
    assert!(found.verification.timestamp.is_some());
}

#[test]
fn lookup_is_idempotent() {
    enable_tracing();

    let srv = TestRegistrySrv::new().unwrap();
    let c = client(&srv);
    let (_kp, record) = signed_example();
    c.blocking_register(&record).unwrap();

    let query = LookupQuery::default().query("My Smart");
    let a = c.blocking_lookup(&query).unwrap();
    let b = c.blocking_lookup(&query).unwrap();
    assert_eq!(a, b);
    assert_eq!(2, srv.lookup_calls());
}

#[test]
fn no_matches() {
    enable_tracing();

    let srv = TestRegistrySrv::new().unwrap();
    let res = client(&srv)
        .blocking_lookup(&LookupQuery::by_agent_id(random_agent_id()))
        .unwrap();
    assert!(res.results.is_empty());
    assert_eq!(0, res.total_matches);
    assert_eq!(None, res.next_page());
}

#[test]
fn pagination_terminates() {
    enable_tracing();

    let srv = TestRegistrySrv::new().unwrap();
    let c = client(&srv);
    for i in 0..25 {
        let (_kp, r) = signed_record(example_builder(format!("agent-{i}.ans")));
        c.blocking_register(&r).unwrap();
    }

    let mut pages = 0;
    let mut seen = std::collections::HashSet::new();
    let mut query = LookupQuery::default().limit(10);
    loop {
        let res = c.blocking_lookup(&query).unwrap();
        pages += 1;
        for r in res.results.iter() {
            assert!(seen.insert(r.agent_id.clone()), "repeat {}", r.agent_id);
        }
        match res.next_page() {
            Some(token) => query = query.page_token(Some(token)),
            None => break,
        }
        assert!(pages < 10, "pagination did not terminate");
    }

    assert_eq!(3, pages);
    assert_eq!(25, seen.len());
}

#[test]
fn default_page_size() {
    enable_tracing();

    let srv = TestRegistrySrv::new().unwrap();
    let c = client(&srv);
    for i in 0..12 {
        let (_kp, r) = signed_record(example_builder(format!("agent-{i}.ans")));
        c.blocking_register(&r).unwrap();
    }

    let res = c.blocking_lookup(&LookupQuery::default()).unwrap();
    assert_eq!(10, res.results.len());
    assert_eq!(Some("agent-9.ans".to_string()), res.next_page());
}

#[test]
fn parameters_are_escaped() {
    enable_tracing();

    let srv = TestRegistrySrv::new().unwrap();
    let c = client(&srv);
    let (_kp, r) = signed_record(
        AgentRecord::builder("sales.ans")
            .name("R&D = sales?")
            .capabilities(["sales", "lead generation"]),
    );
    c.blocking_register(&r).unwrap();

    let res = c
        .blocking_lookup(
            &LookupQuery::default()
                .query("R&D = ")
                .capability("sales")
                .capability("lead generation"),
        )
        .unwrap();
    assert_eq!(1, res.results.len());

    let raw = srv.last_lookup_query().unwrap();
    assert!(!raw.contains("R&D"), "{raw}");
    assert!(raw.starts_with("query=R%26D"), "{raw}");
}

#[test]
fn raw_parameter_lookup() {
    enable_tracing();

    let srv = TestRegistrySrv::new().unwrap();
    let c = client(&srv);
    let (_kp, r) = signed_example();
    c.blocking_register(&r).unwrap();

    let res = c
        .blocking_lookup_params(&[
            ("capabilities", "search_capability"),
            ("limit", "1"),
        ])
        .unwrap();
    assert_eq!(1, res.results.len());

    let none: [(&str, &str); 0] = [];
    let res = c.blocking_lookup_params(&none).unwrap();
    assert_eq!(1, res.results.len());
}

#[test]
fn trust_level_filter() {
    enable_tracing();

    let srv = TestRegistrySrv::new().unwrap();
    let c = client(&srv);
    let (_kp, a) = signed_record(example_builder("a.ans"));
    let (_kp, b) = signed_record(example_builder("b.ans"));
    c.blocking_register(&a).unwrap();
    c.blocking_register(&b).unwrap();
    assert!(srv.set_trust_level("b.ans", "verified"));

    let res = c
        .blocking_lookup(&LookupQuery::default().trust_level("verified"))
        .unwrap();
    let ids: Vec<_> = res.results.iter().map(|r| r.agent_id.as_str()).collect();
    assert_eq!(vec!["b.ans"], ids);

    let res = c
        .blocking_lookup(
            &LookupQuery::default()
                .policy_requirements(r#"{"verification_status":"verified"}"#),
        )
        .unwrap();
    let compat: Vec<_> = res
        .results
        .iter()
        .map(|r| (r.agent_id.as_str(), r.policy_compatibility))
        .collect();
    assert_eq!(vec![("a.ans", false), ("b.ans", true)], compat);
}

#[test]
fn lookup_rejected() {
    enable_tracing();

    let srv = TestRegistrySrv::new().unwrap();
    srv.force_response(503, "registry down for maintenance");

    let err = client(&srv)
        .blocking_lookup(&LookupQuery::default())
        .unwrap_err();
    match err {
        AnsError::LookupRejected { status, body, .. } => {
            assert_eq!(503, status);
            assert_eq!("registry down for maintenance", &*body);
        }
        oth => panic!("unexpected {oth:?}"),
    }
}

#[test]
fn malformed_lookup_response() {
    enable_tracing();

    let srv = TestRegistrySrv::new().unwrap();
    srv.force_response(200, "<html>not json</html>");

    let err = client(&srv)
        .blocking_lookup(&LookupQuery::default())
        .unwrap_err();
    assert!(matches!(err, AnsError::MalformedResponse { .. }), "{err}");
    assert_eq!(Some("<html>not json</html>"), err.body());

    srv.clear_forced_response();
    client(&srv).blocking_lookup(&LookupQuery::default()).unwrap();
}

#[test]
fn free_functions() {
    enable_tracing();

    let srv = TestRegistrySrv::new().unwrap();
    let (_kp, record) = signed_example();

    blocking_register(&srv.url(), &record).unwrap();
    let res = blocking_lookup(
        &srv.url(),
        &LookupQuery::by_agent_id(record.agent_id()),
    )
    .unwrap();
    assert_eq!(1, res.results.len());
}

#[test]
fn concurrent_registrations() {
    enable_tracing();

    let srv = TestRegistrySrv::new().unwrap();
    let c = client(&srv);

    let threads: Vec<_> = (0..8)
        .map(|i| {
            let c = c.clone();
            std::thread::spawn(move || {
                let (_kp, r) =
                    signed_record(example_builder(format!("agent-{i}.ans")));
                c.blocking_register(&r).unwrap();
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    assert_eq!(8, srv.registered().len());
}

#[test]
fn oversized_response_is_malformed() {
    enable_tracing();

    let srv = TestRegistrySrv::new().unwrap();
    srv.force_response(200, "x".repeat(MAX_RESPONSE_BYTES + 1));

    let err = client(&srv)
        .blocking_lookup(&LookupQuery::default())
        .unwrap_err();
    assert!(matches!(err, AnsError::MalformedResponse { .. }));
    assert_eq!(Some(MAX_RESPONSE_BYTES), err.body().map(str::len));
}
