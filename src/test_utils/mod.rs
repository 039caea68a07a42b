#![allow(missing_docs)]

pub(crate) mod stubs;

pub(crate) use stubs::{RecordingStore, StubCompletionClient, StubParser, get_test_store};
