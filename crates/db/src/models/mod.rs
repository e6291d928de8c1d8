pub mod appointment;
pub mod customer;
pub mod invoice;
pub mod mechanic;
pub mod motorcycle;
pub mod motorcycle_model;
pub mod part;
pub mod supplier;
pub mod work_order;
pub mod work_session;
pub mod work_status;
