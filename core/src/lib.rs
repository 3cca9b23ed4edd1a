pub mod badges;
pub mod error;
pub mod gamification;
pub mod persona;
pub mod reconcile;
pub mod stale;
pub mod wire;
