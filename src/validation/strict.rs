// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Strict-mode network and sandbox policy

use super::ValidationResult;
use crate::errors::FlowgateError;
use crate::workflow::WorkflowIr;

/// Known ecosystem identifiers and the domains each one covers
pub const ECOSYSTEMS: &[(&str, &[&str])] = &[
    (
        "defaults",
        &[
            "json-schema.org",
            "crl.microsoft.com",
            "ocsp.digicert.com",
            "packages.microsoft.com",
        ],
    ),
    (
        "github",
        &[
            "github.com",
            "api.github.com",
            "githubusercontent.com",
            "codeload.github.com",
        ],
    ),
    (
        "python",
        &[
            "pypi.org",
            "pypi.python.org",
            "files.pythonhosted.org",
            "bootstrap.pypa.io",
            "conda.anaconda.org",
        ],
    ),
    (
        "node",
        &["registry.npmjs.org", "npmjs.com", "yarnpkg.com", "nodejs.org"],
    ),
    (
        "rust",
        &["crates.io", "static.rust-lang.org", "sh.rustup.rs"],
    ),
    (
        "go",
        &["proxy.golang.org", "sum.golang.org", "go.dev", "golang.org"],
    ),
    (
        "java",
        &[
            "repo.maven.apache.org",
            "repo1.maven.org",
            "plugins.gradle.org",
            "services.gradle.org",
        ],
    ),
    ("dotnet", &["nuget.org", "dot.net", "dotnet.microsoft.com"]),
    ("ruby", &["rubygems.org"]),
    (
        "containers",
        &[
            "ghcr.io",
            "docker.io",
            "registry-1.docker.io",
            "quay.io",
            "mcr.microsoft.com",
            "gcr.io",
        ],
    ),
    (
        "linux-distros",
        &[
            "deb.debian.org",
            "security.debian.org",
            "archive.ubuntu.com",
            "security.ubuntu.com",
            "dl-cdn.alpinelinux.org",
            "mirrors.fedoraproject.org",
        ],
    ),
    (
        "terraform",
        &["releases.hashicorp.com", "registry.terraform.io"],
    ),
    (
        "playwright",
        &["playwright.azureedge.net", "cdn.playwright.dev"],
    ),
];

/// Ecosystem an allow-list entry belongs to. An identifier belongs to
/// itself; a domain belongs to the ecosystem covering it or a parent domain.
pub fn ecosystem_of(entry: &str) -> Option<&'static str> {
    let entry = entry.trim().to_ascii_lowercase();
    let domain = entry.strip_prefix("*.").unwrap_or(&entry);

    ECOSYSTEMS.iter().find_map(|(id, domains)| {
        let covered = *id == domain
            || domains
                .iter()
                .any(|d| domain == *d || domain.ends_with(&format!(".{}", d)));
        covered.then_some(*id)
    })
}

/// Ecosystem covering a subdomain of `entry`, suggested when the entry is
/// broader than anything an ecosystem allows
fn narrower_ecosystem(entry: &str) -> Option<&'static str> {
    let suffix = format!(".{}", entry.trim().trim_start_matches("*.").to_ascii_lowercase());
    ECOSYSTEMS
        .iter()
        .find(|(_, domains)| domains.iter().any(|d| d.ends_with(&suffix)))
        .map(|(id, _)| *id)
}

/// Enforce the network allow-list, sandbox and firewall rules.
///
/// Outside strict mode the same findings are reported as warnings where a
/// softer reading exists.
pub fn check_strict_policy(ir: &WorkflowIr, strict: bool, result: &mut ValidationResult) {
    if ir.sandbox.is_disabled() {
        if strict {
            result.add_error(FlowgateError::StrictSandboxDisabled);
        } else {
            result.add_warning("The agent sandbox is disabled; the agent runs without isolation");
        }
    }

    let Some(network) = &ir.network else {
        return;
    };
    if network.is_wildcard() {
        return;
    }

    let engine = ir.engine.id;
    if !engine.supports_firewall() {
        if strict {
            result.add_error(FlowgateError::FirewallUnsupported {
                engine: engine.as_str().to_string(),
            });
        } else {
            result.add_warning(format!(
                "Engine '{}' cannot enforce the network allow-list; network access is not restricted",
                engine.as_str()
            ));
        }
    }

    if !strict || engine.supports_llm_gateway() {
        return;
    }

    for entry in &network.allowed {
        if ecosystem_of(entry).is_none() {
            result.add_error(FlowgateError::strict_network(entry, narrower_ecosystem(entry)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(yaml: &str, strict: bool) -> ValidationResult {
        let ir = WorkflowIr::from_yaml(yaml).unwrap();
        let mut result = ValidationResult::new();
        check_strict_policy(&ir, strict, &mut result);
        result
    }

    #[test]
    fn test_ecosystem_lookup() {
        assert_eq!(ecosystem_of("python"), Some("python"));
        assert_eq!(ecosystem_of("files.pythonhosted.org"), Some("python"));
        assert_eq!(ecosystem_of("*.crates.io"), Some("rust"));
        assert_eq!(ecosystem_of("index.crates.io"), Some("rust"));
        assert_eq!(ecosystem_of("example.com"), None);
        assert_eq!(ecosystem_of("notcrates.io"), None);
    }

    #[test]
    fn test_unknown_domain_rejected_in_strict_mode() {
        let yaml = "name: x\nnetwork:\n  allowed: [defaults, example.com]\n";
        let result = check(yaml, true);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].to_string().contains("example.com"));

        assert!(check(yaml, false).is_valid());
    }

    #[test]
    fn test_ecosystem_domains_allowed_in_strict_mode() {
        let result = check(
            "name: x\nnetwork:\n  allowed: [github, pypi.org, registry.npmjs.org]\n",
            true,
        );
        assert!(result.is_valid());
    }

    #[test]
    fn test_wildcard_bypasses_check() {
        let result = check("name: x\nnetwork:\n  allowed: ['*', example.com]\n", true);
        assert!(result.is_valid());
    }

    #[test]
    fn test_gateway_engine_skips_domain_check() {
        let result = check(
            "name: x\nengine:\n  id: codex\nnetwork:\n  allowed: [example.com]\n",
            true,
        );
        assert!(result.is_valid());
    }

    #[test]
    fn test_sandbox_disabled_always_rejected_in_strict_mode() {
        let result = check(
            "name: x\nengine:\n  id: codex\nsandbox:\n  agent: false\nnetwork:\n  allowed: ['*']\n",
            true,
        );
        assert!(matches!(
            result.errors[0],
            FlowgateError::StrictSandboxDisabled
        ));
    }

    #[test]
    fn test_firewall_gap_is_warning_unless_strict() {
        let yaml = "name: x\nengine:\n  id: custom\nnetwork:\n  allowed: [defaults]\n";
        let relaxed = check(yaml, false);
        assert!(relaxed.is_valid());
        assert_eq!(relaxed.warnings.len(), 1);

        let strict = check(yaml, true);
        assert!(matches!(
            strict.errors[0],
            FlowgateError::FirewallUnsupported { .. }
        ));
    }

    #[test]
    fn test_identifiers_are_case_insensitive() {
        let result = check("name: x\nnetwork:\n  allowed: [Python]\n", true);
        assert!(result.is_valid());
    }

    #[test]
    fn test_broad_domain_gets_ecosystem_hint() {
        assert_eq!(narrower_ecosystem("maven.org"), Some("java"));
        assert_eq!(narrower_ecosystem("example.com"), None);

        let result = check("name: x\nnetwork:\n  allowed: [hashicorp.com]\n", true);
        let FlowgateError::StrictNetwork { help, .. } = &result.errors[0] else {
            panic!("expected strict network error");
        };
        assert!(help.as_deref().unwrap().contains("'terraform'"));
    }
}
