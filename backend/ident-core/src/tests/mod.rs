mod config;
mod same_user;
