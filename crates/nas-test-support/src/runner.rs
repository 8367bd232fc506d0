//! Command runners that never touch the system.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io;
use std::sync::Mutex;

use nas_os_common::{CommandRunner, NasError, NasResult, RawOutput};

type Handler = dyn Fn(&[String]) -> NasResult<RawOutput> + Send + Sync;

/// Records every argument vector and answers through a handler closure.
pub struct ScriptedRunner {
    handler: Box<Handler>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedRunner {
    /// Replies with whatever `handler` returns for each command.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&[String]) -> RawOutput + Send + Sync + 'static,
    {
        Self::with_result(move |argv| Ok(handler(argv)))
    }

    /// Like [`new`](Self::new), but the handler may fail the spawn itself.
    pub fn with_result<F>(handler: F) -> Self
    where
        F: Fn(&[String]) -> NasResult<RawOutput> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every command exits 0 with no output.
    pub fn succeeding() -> Self {
        Self::new(|_| RawOutput::ok(""))
    }

    /// Every command exits with `exit_code`.
    pub fn failing(exit_code: i32) -> Self {
        Self::new(move |_| RawOutput::failed(exit_code, "Operation not permitted"))
    }

    /// Every spawn fails as if the binary were missing.
    pub fn unspawnable() -> Self {
        Self::with_result(|argv| {
            Err(NasError::Spawn {
                command: argv.join(" "),
                source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
            })
        })
    }

    /// All recorded argument vectors, oldest first.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock poisoned").len()
    }

    pub fn last_call(&self) -> Option<Vec<String>> {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .last()
            .cloned()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn spawn(&self, argv: &[String]) -> NasResult<RawOutput> {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push(argv.to_vec());
        (self.handler)(argv)
    }
}

const BRCTL_HEADER: &str = "bridge name\tbridge id\t\tSTP enabled\tinterfaces";

/// Emulates `brctl` against an in-memory bridge table.
///
/// Supports `addbr`, `delbr`, `addif`, `delif` and `show [bridge]` with the
/// same output layout and failure behaviour as the real tool. Any other
/// command succeeds silently.
#[derive(Default)]
pub struct FakeBridgeRunner {
    bridges: Mutex<BTreeMap<String, Vec<String>>>,
}

impl FakeBridgeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current bridge names.
    pub fn bridges(&self) -> Vec<String> {
        self.bridges
            .lock()
            .expect("bridge lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    fn bridge_id(index: usize) -> String {
        format!("8000.{:012x}", index + 1)
    }

    fn render(table: &BTreeMap<String, Vec<String>>, only: Option<&str>) -> String {
        let mut out = format!("{}\n", BRCTL_HEADER);
        for (index, (name, members)) in table.iter().enumerate() {
            if only.is_some_and(|b| b != name) {
                continue;
            }
            let id = Self::bridge_id(index);
            match members.split_first() {
                Some((first, rest)) => {
                    out.push_str(&format!("{}\t\t{}\tno\t\t{}\n", name, id, first));
                    for member in rest {
                        out.push_str(&format!("\t\t\t\t\t\t\t{}\n", member));
                    }
                }
                None => out.push_str(&format!("{}\t\t{}\tno\n", name, id)),
            }
        }
        out
    }

    fn handle(&self, args: &[String]) -> RawOutput {
        let mut table = self.bridges.lock().expect("bridge lock poisoned");
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        match args.as_slice() {
            ["addbr", br] => {
                if table.contains_key(*br) {
                    let msg = "already exists; can't create bridge with the same name";
                    return RawOutput::failed(1, format!("device {} {}\n", br, msg));
                }
                table.insert(br.to_string(), Vec::new());
                RawOutput::ok("")
            }
            ["delbr", br] => match table.remove(*br) {
                Some(_) => RawOutput::ok(""),
                None => {
                    let msg = format!("bridge {} doesn't exist; can't delete it\n", br);
                    RawOutput::failed(1, msg)
                }
            },
            ["addif", br, ifname] => match table.get_mut(*br) {
                Some(members) if members.iter().any(|m| m == ifname) => {
                    let msg = "is already a member of a bridge; can't enslave it to bridge";
                    RawOutput::failed(1, format!("device {} {} {}.\n", ifname, msg, br))
                }
                Some(members) => {
                    members.push(ifname.to_string());
                    RawOutput::ok("")
                }
                None => RawOutput::failed(1, format!("bridge {} does not exist!\n", br)),
            },
            ["delif", br, ifname] => match table.get_mut(*br) {
                Some(members) if members.iter().any(|m| m == ifname) => {
                    members.retain(|m| m != ifname);
                    RawOutput::ok("")
                }
                Some(_) => {
                    let msg = format!("device {} is not a slave of {}\n", ifname, br);
                    RawOutput::failed(1, msg)
                }
                None => RawOutput::failed(1, format!("bridge {} does not exist!\n", br)),
            },
            ["show"] => RawOutput::ok(Self::render(&table, None)),
            ["show", br] if table.contains_key(*br) => {
                RawOutput::ok(Self::render(&table, Some(*br)))
            }
            ["show", br] => RawOutput::failed(1, format!("bridge {} does not exist!\n", br)),
            _ => RawOutput::failed(1, "Usage: brctl [commands]\n"),
        }
    }
}

#[async_trait]
impl CommandRunner for FakeBridgeRunner {
    async fn spawn(&self, argv: &[String]) -> NasResult<RawOutput> {
        match argv.split_first() {
            Some((program, args)) if program.ends_with("brctl") => Ok(self.handle(args)),
            _ => Ok(RawOutput::ok("")),
        }
    }
}
