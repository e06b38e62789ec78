//! Integration tests for boardwatch
//!
//! Uses wiremock to simulate the VID/PID identification service and
//! scripted discovery backends to drive listing and watching end to end.

mod common;

mod test_list;
