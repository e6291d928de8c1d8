pub mod billing;
pub mod config;
pub mod customers;
pub mod dashboard;
pub mod fleet;
pub mod health;
pub mod inventory;
pub mod portal;
pub mod scheduling;
pub mod staff;
pub mod validation;
pub mod work_orders;
pub mod work_sessions;

#[cfg(test)]
pub(crate) mod test_support;
