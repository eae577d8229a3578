//! Infrastructure adapters for rule, template, target, instance, and event backends.

pub mod store;

pub use store::memory::{
    InMemoryAssignmentDirectory, InMemoryEventQueue, InMemoryInstanceStore, InMemoryRuleStore,
    InMemoryTargetDirectory, InMemoryTemplateStore,
};
pub use store::postgres::{PostgresEventQueue, PostgresInstanceStore};
pub use store::{
    AssignmentDirectory, EventQueue, InstanceStore, RuleStore, TargetDirectory, TargetInfo,
    TemplateContent, TemplateStore, UserRef,
};
