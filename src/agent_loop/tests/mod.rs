use super::*;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures::StreamExt;
use tokio::time::{timeout, Duration};

use crate::error::MedicError;
use crate::provider::ModelReply;
use crate::types::Role;

mod support;

mod projection;

use support::{
    capture_events, driver_with, notifications, shell_call, test_context, turns, wait_until, EventLog,
    ScriptedProvider, TrackedTool,
};
