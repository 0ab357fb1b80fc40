#![allow(dead_code, unused_imports)]

pub use stackpull_test_utils::builders;
pub use stackpull_test_utils::{
    init_tracing, with_timeout, FakeOrchestrator, GatedRunner, OrchestratorCall,
};
