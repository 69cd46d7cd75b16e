//! Child process output pumping.
//!
//! The supervised container's stdout and stderr are drained
//! line-by-line into the rig's log under the `container` target, one
//! thread per stream. Draining continuously also keeps the child from
//! blocking on a full pipe.

use std::io::{BufRead, BufReader, Read};
use std::process::{ChildStderr, ChildStdout};
use std::thread::{self, JoinHandle};

pub struct OutputPump {
    threads: Vec<JoinHandle<()>>,
}

impl OutputPump {
    /// Spawn one pump thread per present stream.
    pub fn spawn(stdout: Option<ChildStdout>, stderr: Option<ChildStderr>) -> Self {
        let mut threads = Vec::new();

        if let Some(stdout) = stdout {
            threads.push(pump_lines("stdout", stdout));
        }
        if let Some(stderr) = stderr {
            threads.push(pump_lines("stderr", stderr));
        }

        OutputPump { threads }
    }

    /// Wait for both streams to reach EOF. Called after the child has
    /// exited so the tail of its output lands in the log.
    pub fn join(self) {
        for handle in self.threads {
            let _ = handle.join();
        }
    }
}

fn pump_lines<R: Read + Send + 'static>(label: &'static str, stream: R) -> JoinHandle<()> {
    thread::spawn(move || {
        let reader = BufReader::new(stream);
        for line in reader.lines() {
            match line {
                Ok(line) => log::info!(target: "container", "[{}] {}", label, line),
                Err(e) => {
                    log::debug!(target: "container", "[{}] stream ended: {}", label, e);
                    break;
                }
            }
        }
    })
}
