mod frontend;
mod health_check;
mod helpers;
