mod list;
mod watch;

pub(crate) use list::list_command;
pub(crate) use watch::watch_command;
