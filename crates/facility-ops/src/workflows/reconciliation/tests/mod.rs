mod change_log;
mod common;
mod routing;
