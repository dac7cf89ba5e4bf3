use std::path::{Path, PathBuf};

use {
    anyhow::Context,
    tracing::{debug, warn},
};

use crate::schema::RelayConfig;

const CONFIG_BASENAME: &str = "tgrelay";

/// Supported config file formats, keyed by extension.
#[derive(Debug, Clone, Copy)]
enum Format {
    Toml,
    Yaml,
    Json,
}

impl Format {
    const ALL: &[(&str, Format)] = &[
        ("toml", Format::Toml),
        ("yaml", Format::Yaml),
        ("yml", Format::Yaml),
        ("json", Format::Json),
    ];

    fn for_path(path: &Path) -> anyhow::Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
        Self::ALL
            .iter()
            .find(|(candidate, _)| *candidate == ext)
            .map(|(_, format)| *format)
            .with_context(|| format!("unsupported config format: .{ext}"))
    }

    fn parse(self, raw: &str) -> anyhow::Result<RelayConfig> {
        match self {
            Self::Toml => toml::from_str(raw).context("invalid TOML config"),
            Self::Yaml => serde_yaml::from_str(raw).context("invalid YAML config"),
            Self::Json => serde_json::from_str(raw).context("invalid JSON config"),
        }
    }
}

/// Load config from the given path (any supported format), expanding
/// `${ENV_VAR}` placeholders before parsing.
pub fn load_config(path: &Path) -> anyhow::Result<RelayConfig> {
    let format = Format::for_path(path)?;
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    format.parse(&expand_env(&raw))
}

/// Discover and load config from standard locations.
///
/// Search order: `./tgrelay.{toml,yaml,yml,json}` first, then the same names
/// under the user config dir (`~/.config/tgrelay/`). Returns
/// `RelayConfig::default()` when nothing is found; validation will then
/// reject the empty channel wiring before anything connects.
pub fn discover_and_load() -> RelayConfig {
    let Some(path) = candidate_paths().find(|p| p.is_file()) else {
        debug!("no config file found, using defaults");
        return RelayConfig::default();
    };

    debug!(path = %path.display(), "loading config");
    load_config(&path).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
        RelayConfig::default()
    })
}

/// Candidate config paths in priority order: every project-local name, then
/// the same names under the user config dir.
fn candidate_paths() -> impl Iterator<Item = PathBuf> {
    let names: Vec<String> = Format::ALL
        .iter()
        .map(|(ext, _)| format!("{CONFIG_BASENAME}.{ext}"))
        .collect();

    let local = names.clone().into_iter().map(PathBuf::from);
    let global = directories::ProjectDirs::from("", "", CONFIG_BASENAME)
        .into_iter()
        .flat_map(move |dirs| {
            let dir = dirs.config_dir().to_path_buf();
            names.clone().into_iter().map(move |name| dir.join(name))
        });

    local.chain(global)
}

/// Expand `${NAME}` placeholders from the process environment.
///
/// Unknown and malformed placeholders are kept literally, so a missing
/// variable in a non-string position surfaces as a parse error instead of
/// silently zeroing a field.
fn expand_env(raw: &str) -> String {
    expand_with(raw, |name| std::env::var(name).ok())
}

fn expand_with(raw: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 2..];

        let Some(end) = tail.find('}') else {
            // Unterminated placeholder: keep the remainder untouched.
            out.push_str(&rest[start..]);
            return out;
        };

        let name = &tail[..end];
        match lookup(name).filter(|_| !name.is_empty()) {
            Some(value) => out.push_str(&value),
            None => {
                out.push_str("${");
                out.push_str(name);
                out.push('}');
            },
        }
        rest = &tail[end + 1..];
    }

    out.push_str(rest);
    out
}
