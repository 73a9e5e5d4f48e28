pub mod alarm_config;
pub mod alarm_info;
