#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use assert_cmd::assert::Assert;
use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::{json, Value};
use tempfile::TempDir;

use lspace_core::{ENV_EDITOR, ENV_HOME, ENV_SEARCH_ROOT};
use lspace_domain::{LINK_PREFIX, MANIFEST_FILE, STAGING_DIR, YARN_LOCKFILE};

/// A hermetic environment for one space: a private data dir, a checkout
/// tree for the locator to search, and a no-op editor.
pub struct SpaceFixture {
    pub temp: TempDir,
    pub home: PathBuf,
    pub checkouts: PathBuf,
}

pub fn fixture(prefix: &str) -> SpaceFixture {
    let temp = tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("tempdir");
    let home = temp.path().join("home");
    let checkouts = temp.path().join("checkouts");
    fs::create_dir_all(&home).expect("home dir");
    fs::create_dir_all(&checkouts).expect("checkouts dir");
    SpaceFixture {
        temp,
        home,
        checkouts,
    }
}

pub fn lspace_in(space: &SpaceFixture, cwd: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("lspace");
    cmd.current_dir(cwd)
        .env(ENV_HOME, &space.home)
        .env(ENV_SEARCH_ROOT, &space.checkouts)
        .env(ENV_EDITOR, "true");
    cmd
}

/// Writes a package checkout under the fixture's search root. Linked
/// dependencies get a staged copy so the space resolves as installed.
pub fn write_package(space: &SpaceFixture, name: &str, deps: &[(&str, bool)]) -> PathBuf {
    let dir = space.checkouts.join(name.replace('/', "-"));
    fs::create_dir_all(&dir).expect("package dir");
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
        serde_json::to_string_pretty(&manifest).expect("manifest json"),
    )
    .expect("write manifest");
    for (dep, linked) in deps {
        if *linked {
            stage_copy(&dir, dep);
        }
    }
    dir
}

pub fn stage_copy(project: &Path, dep: &str) {
    let mut staged = project.join(STAGING_DIR);
    for part in dep.split('/') {
        staged.push(part);
    }
    fs::create_dir_all(&staged).expect("staged dir");
    fs::write(
        staged.join(MANIFEST_FILE),
        format!(r#"{{ "name": "{dep}", "version": "0.0.0" }}"#),
    )
    .expect("staged manifest");
}

pub fn write_yarn_lock(dir: &Path, entries: &[(&str, &[&str])]) {
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
    fs::write(dir.join(YARN_LOCKFILE), contents).expect("write lockfile");
}

/// Overrides every engine command with `command` for the named packages,
/// keyed under the space of `root_non_scoped`.
pub fn override_commands(space: &SpaceFixture, root_non_scoped: &str, names: &[&str]) {
    let mut map = serde_json::Map::new();
    for name in names {
        map.insert(
            (*name).to_string(),
            json!({
                "install": "true",
                "build": "true",
                "publish": "true",
                "push": "true",
                "link": "true",
                "unlink": "true",
            }),
        );
    }
    write_settings(space, root_non_scoped, &Value::Object(map));
}

pub fn write_settings(space: &SpaceFixture, root_non_scoped: &str, settings: &Value) {
    let dir = space.home.join(root_non_scoped);
    fs::create_dir_all(&dir).expect("space dir");
    fs::write(
        dir.join("settings.json"),
        serde_json::to_string_pretty(settings).expect("settings json"),
    )
    .expect("write settings");
}

pub fn workspace_file(space: &SpaceFixture, root_non_scoped: &str) -> PathBuf {
    space
        .home
        .join(root_non_scoped)
        .join(format!("{root_non_scoped}.code-workspace"))
}

pub fn parse_json(assert: &Assert) -> Value {
    serde_json::from_slice(&assert.get_output().stdout).expect("valid json")
}

pub fn stdout_of(assert: &Assert) -> String {
    String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout")
}

/// A stand-in for the link tool: `remove <pkg>` rewrites the consumer's
/// manifest back to a registry range. Unix only, it is a shell script.
#[cfg(unix)]
pub fn write_fake_unlink(space: &SpaceFixture) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = space.temp.path().join("fake-unlink");
    let script = format!(
        "#!/bin/sh\n[ \"$1\" = remove ] || exit 64\ntmp=\"{MANIFEST_FILE}.tmp\"\n\
         sed \"s|\\\"{LINK_PREFIX}/$2\\\"|\\\"^1.0.0\\\"|\" {MANIFEST_FILE} > \"$tmp\" \
         && mv \"$tmp\" {MANIFEST_FILE}\n"
    );
    fs::write(&path, script).expect("write script");
    let mut perms = fs::metadata(&path).expect("script metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("chmod script");
    path
}
