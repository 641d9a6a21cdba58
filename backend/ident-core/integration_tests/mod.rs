mod client;
mod helpers;
mod same_user;
