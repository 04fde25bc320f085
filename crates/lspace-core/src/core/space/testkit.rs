//! Fixture helpers and fakes shared by the engine tests: an in-memory
//! locator and a command runner that emulates a link tool by editing
//! manifests on disk.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use anyhow::Result;
use serde_json::{json, Value};

use lspace_domain::{LINK_PREFIX, MANIFEST_FILE, YARN_LOCKFILE};

use crate::core::runtime::effects::{CommandRunner, Effects, ProjectLocator};
use crate::core::runtime::process::RunOutput;
use crate::core::space::builder::staged_package_dir;

pub(crate) fn staged_dir(project: &Path, name: &str) -> PathBuf {
    staged_package_dir(&project.join(lspace_domain::STAGING_DIR), name)
}

/// Writes a minimal package at `dir`: a manifest, plus staged copies for
/// every linked dependency so link checks see an installed package.
/// Returns the directory.
pub(crate) fn write_package(dir: &Path, name: &str, deps: &[(&str, bool)]) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let mut dependencies = serde_json::Map::new();
    for (dep, linked) in deps {
        let version = if *linked {
            format!("{LINK_PREFIX}/{dep}")
        } else {
            "^1.0.0".to_string()
        };
        dependencies.insert((*dep).to_string(), Value::String(version));
    }
    let manifest = json!({
        "name": name,
        "version": "1.0.0",
        "dependencies": Value::Object(dependencies),
    });
    fs::write(
        dir.join(MANIFEST_FILE),
        serde_json::to_string_pretty(&manifest).unwrap(),
    )
    .unwrap();
    for (dep, linked) in deps {
        if *linked {
            stage_copy(dir, dep);
        }
    }
    dir.to_path_buf()
}

pub(crate) fn stage_copy(project: &Path, dep: &str) {
    let staged = staged_dir(project, dep);
    fs::create_dir_all(&staged).unwrap();
    fs::write(
        staged.join(MANIFEST_FILE),
        format!(r#"{{ "name": "{dep}", "version": "0.0.0" }}"#),
    )
    .unwrap();
}

/// Writes a v1 yarn lockfile with one entry per package.
pub(crate) fn write_yarn_lock(dir: &Path, entries: &[(&str, &[&str])]) {
    let mut contents = String::from("# yarn lockfile v1\n\n");
    for (name, deps) in entries {
        contents.push_str(&format!("\"{name}@^1.0.0\":\n  version \"1.0.0\"\n"));
        if !deps.is_empty() {
            contents.push_str("  dependencies:\n");
            for dep in *deps {
                contents.push_str(&format!("    \"{dep}\" \"^1.0.0\"\n"));
            }
        }
        contents.push('\n');
    }
    fs::write(dir.join(YARN_LOCKFILE), contents).unwrap();
}

/// Locator answering from a fixed table; nothing touches disk.
#[derive(Clone, Default)]
pub(crate) struct StaticLocator {
    known: HashMap<String, PathBuf>,
}

impl StaticLocator {
    pub(crate) fn of<P: AsRef<Path>>(entries: &[(&str, P)]) -> Self {
        Self {
            known: entries
                .iter()
                .map(|(name, path)| ((*name).to_string(), path.as_ref().to_path_buf()))
                .collect(),
        }
    }
}

impl ProjectLocator for StaticLocator {
    fn locate(&self, full_name: &str) -> Result<Option<PathBuf>> {
        Ok(self.known.get(full_name).cloned())
    }
}

#[derive(Clone, Debug)]
pub(crate) struct RecordedCommand {
    pub(crate) rendered: String,
    pub(crate) cwd: PathBuf,
}

/// Command runner that emulates the link tool: `yalc add` and
/// `yalc remove` edit the consumer manifest and its staging directory,
/// everything else succeeds without side effects. Mutations count only
/// when a manifest actually changes, so idempotence is observable.
pub(crate) struct FakeLinkTool {
    commands: Mutex<Vec<RecordedCommand>>,
    mutations: AtomicUsize,
    fail_matching: Mutex<Option<String>>,
}

impl FakeLinkTool {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            commands: Mutex::new(Vec::new()),
            mutations: AtomicUsize::new(0),
            fail_matching: Mutex::new(None),
        })
    }

    /// Makes every later command whose rendering starts with `prefix`
    /// exit nonzero.
    pub(crate) fn fail_when(&self, prefix: &str) {
        *self.fail_matching.lock().unwrap() = Some(prefix.to_string());
    }

    pub(crate) fn recorded(&self) -> Vec<RecordedCommand> {
        self.commands.lock().unwrap().clone()
    }

    pub(crate) fn rendered_commands(&self) -> Vec<String> {
        self.recorded()
            .into_iter()
            .map(|command| command.rendered)
            .collect()
    }

    pub(crate) fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }
}

impl CommandRunner for FakeLinkTool {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> Result<RunOutput> {
        let rendered = std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        self.commands.lock().unwrap().push(RecordedCommand {
            rendered: rendered.clone(),
            cwd: cwd.to_path_buf(),
        });
        if let Some(prefix) = self.fail_matching.lock().unwrap().as_deref() {
            if rendered.starts_with(prefix) {
                return Ok(RunOutput {
                    code: 1,
                    stdout: String::new(),
                    stderr: "induced failure".to_string(),
                });
            }
        }
        let changed = match (program, args.first().map(String::as_str), args.last()) {
            ("yalc", Some("add"), Some(name)) => fake_add(cwd, name),
            ("yalc", Some("remove"), Some(name)) => fake_remove(cwd, name),
            _ => false,
        };
        if changed {
            self.mutations.fetch_add(1, Ordering::SeqCst);
        }
        Ok(RunOutput {
            code: 0,
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    fn run_passthrough(&self, program: &str, args: &[String], cwd: &Path) -> Result<RunOutput> {
        self.run(program, args, cwd)
    }
}

fn fake_add(cwd: &Path, name: &str) -> bool {
    let manifest_path = cwd.join(MANIFEST_FILE);
    let contents = fs::read_to_string(&manifest_path).unwrap();
    let mut doc: Value = serde_json::from_str(&contents).unwrap();
    let link_value = Value::String(format!("{LINK_PREFIX}/{name}"));

    let table = if doc
        .get("devDependencies")
        .and_then(|table| table.get(name))
        .is_some()
    {
        "devDependencies"
    } else {
        "dependencies"
    };
    let entries = doc
        .as_object_mut()
        .unwrap()
        .entry(table)
        .or_insert_with(|| Value::Object(serde_json::Map::new()))
        .as_object_mut()
        .unwrap();
    let changed = entries.get(name) != Some(&link_value);
    entries.insert(name.to_string(), link_value);
    if changed {
        fs::write(&manifest_path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
    }
    if !staged_dir(cwd, name).join(MANIFEST_FILE).exists() {
        stage_copy(cwd, name);
    }
    changed
}

fn fake_remove(cwd: &Path, name: &str) -> bool {
    let manifest_path = cwd.join(MANIFEST_FILE);
    let contents = fs::read_to_string(&manifest_path).unwrap();
    let mut doc: Value = serde_json::from_str(&contents).unwrap();
    let mut changed = false;
    for table in ["dependencies", "devDependencies"] {
        if let Some(entries) = doc.get_mut(table).and_then(Value::as_object_mut) {
            changed |= entries.remove(name).is_some();
        }
    }
    if changed {
        fs::write(&manifest_path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
    }
    let staged = staged_dir(cwd, name);
    if staged.exists() {
        let _ = fs::remove_dir_all(&staged);
    }
    changed
}

pub(crate) struct TestEffects {
    runner: Arc<FakeLinkTool>,
    locator: Arc<StaticLocator>,
}

impl TestEffects {
    pub(crate) fn new(runner: Arc<FakeLinkTool>, locator: StaticLocator) -> Self {
        Self {
            runner,
            locator: Arc::new(locator),
        }
    }
}

impl Effects for TestEffects {
    fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    fn locator(&self) -> &dyn ProjectLocator {
        self.locator.as_ref()
    }
}

/// Config pointing every data path inside `data_dir`.
pub(crate) fn test_config(data_dir: &Path) -> crate::core::config::settings::Config {
    use crate::core::config::settings::{EnvSnapshot, ENV_HOME, ENV_SEARCH_ROOT};
    let data = data_dir.to_string_lossy().into_owned();
    let snapshot = EnvSnapshot::testing(&[
        (ENV_HOME, data.as_str()),
        (ENV_SEARCH_ROOT, data.as_str()),
    ]);
    crate::core::config::settings::Config::from_snapshot(&snapshot).unwrap()
}
