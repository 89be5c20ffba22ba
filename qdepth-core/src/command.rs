//! Builders for the commands sent into the queue manager container
//!
//! The diagnostic command pipes an MQSC directive into `runmqsc`:
//!
//! ```
//! let cmd = qdepth_core::command::display_queue_depth("ORDERS", "QM1");
//! assert_eq!(cmd[2], r#"echo "display ql(ORDERS) curdepth" | runmqsc -e QM1"#);
//! ```

/// The `runmqsc` query for the current depth of `queue` on the manager `manager`
///
/// `queue` may be a generic name such as `*` or `APP.*`, in which case the
/// report holds one block per matched queue.
pub fn display_queue_depth(queue: &str, manager: &str) -> Vec<String> {
    shell(format!(
        r#"echo "display ql({queue}) curdepth" | runmqsc -e {manager}"#
    ))
}

/// Write stdin into `remote_path`, truncating any existing file
pub fn put_file(remote_path: &str) -> Vec<String> {
    shell(format!("cat > {}", quote(remote_path)))
}

/// Stream the contents of `remote_path` to stdout
pub fn cat_file(remote_path: &str) -> Vec<String> {
    shell(format!("cat {}", quote(remote_path)))
}

fn shell(script: String) -> Vec<String> {
    vec!["sh".into(), "-c".into(), script]
}

// single quotes suppress all expansion; embedded quotes are closed, escaped and reopened
fn quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_command_interpolates_queue_and_manager() {
        let cmd = display_queue_depth("APP.*", "QM1");
        assert_eq!(cmd.len(), 3);
        assert_eq!(&cmd[..2], ["sh", "-c"]);
        assert_eq!(cmd[2], r#"echo "display ql(APP.*) curdepth" | runmqsc -e QM1"#);
    }

    #[test]
    fn file_commands_quote_paths() {
        assert_eq!(put_file("/tmp/a b")[2], "cat > '/tmp/a b'");
        assert_eq!(cat_file("/tmp/it's")[2], r"cat '/tmp/it'\''s'");
    }
}
