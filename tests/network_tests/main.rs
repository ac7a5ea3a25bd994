//! Client and server tests over loopback sockets

mod server_tests;
