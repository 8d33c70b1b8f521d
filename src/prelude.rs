// Level macros routed through `observability`; the backend is chosen by feature flags.

#[allow(unused_imports, reason = "not every level is used in every module")]
pub(crate) use crate::observability::{log_debug as debug, log_info as info, log_warn as warn};
