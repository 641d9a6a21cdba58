mod helpers;
mod serve;
