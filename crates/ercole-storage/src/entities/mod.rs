pub mod host_license_history;
pub mod hostdata;
