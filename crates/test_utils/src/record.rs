//! Test utilities associated with agent records.

use ans_api::*;
use ans_core::P256KeyPair;

/// Build the unsigned reference record used throughout the tests,
/// carrying the given public key PEM.
pub fn example_record(public_key_pem: &str) -> AgentRecord {
    example_builder("my-smart-agent.ans")
        .public_key(public_key_pem)
        .build()
}

/// A builder pre-filled with the reference record's descriptive fields.
pub fn example_builder(agent_id: impl Into<String>) -> AgentRecordBuilder {
    AgentRecord::builder(agent_id)
        .name("My Smart AI Agent")
        .description("An agent that can.....")
        .organization("My Org")
        .capabilities(["search_capability", "test2_feature"])
        .endpoint("rest", "https://smartai.test.com/api/v1")
        .endpoint("a2a", "https://smartai.test.com/a2a")
}

/// Generate a key pair and a record signed with it.
pub fn signed_record(
    builder: AgentRecordBuilder,
) -> (P256KeyPair, AgentRecord) {
    let kp = P256KeyPair::generate().unwrap();
    let record = builder.public_key(kp.public_key_pem().unwrap()).build();
    let record = kp.sign_record(record).unwrap();
    (kp, record)
}

/// The signed reference record under a fresh key.
pub fn signed_example() -> (P256KeyPair, AgentRecord) {
    signed_record(example_builder("my-smart-agent.ans"))
}
