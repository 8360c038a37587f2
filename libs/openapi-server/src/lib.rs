//! HTTP wire models shared by the routergate server and its clients.

pub mod models;
