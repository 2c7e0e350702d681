// SPDX-License-Identifier: MIT

//! Identifier newtypes used across the Runtime.

crate::define_id! {
    /// Identifies one end-to-end run of an agent over a task.
    pub struct ExecutionId("exec");
}

crate::define_id! {
    /// Identifies a single immutable [`crate::event::Event`].
    pub struct EventId("evnt");
}

crate::define_id! {
    /// Identifies a node in a `daer_dag::TaskGraph` (a `TaskNode`).
    pub struct NodeId("node");
}

crate::define_id! {
    /// Identifies a scheduler worker process.
    pub struct WorkerId("work");
}

crate::define_id! {
    /// Identifies one queued `daer_scheduler::Job`.
    pub struct SchedJobId("sjob");
}

crate::define_id! {
    /// Distributed trace identifier, carried unchanged across replay (spec §4.6).
    pub struct TraceId("trce");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_string() {
        let id = ExecutionId::new();
        let parsed = ExecutionId::from_string(id.as_str());
        assert_eq!(id, parsed);
    }

    #[test]
    fn ids_carry_their_type_prefix() {
        assert!(ExecutionId::new().as_str().starts_with("exec"));
        assert!(EventId::new().as_str().starts_with("evnt"));
        assert!(NodeId::new().as_str().starts_with("node"));
    }
}
