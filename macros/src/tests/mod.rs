//! Unit tests for the derive macro internals
