// RPC services
// Each service owns a clone of the database handle and exposes `_`-prefixed
// inherent methods that take the evaluation time explicitly.

pub mod authz;
pub mod debates;
pub mod groups;
pub mod penalties;
pub mod policies;
pub mod sweeper;
pub mod votes;
