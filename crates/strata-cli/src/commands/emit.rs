//! Emit command - module-info record of a resolved module

use super::Session;
use anyhow::{bail, Result};
use std::fmt::Write;
use strata_modules::{emit::PackageInfo, ModuleInfo};

pub fn run(session: &Session, module: &str) -> Result<()> {
    let graph = session.graph()?;
    let Some(info) = graph.module_info(module) else {
        bail!("module {} is not part of the resolved graph", module);
    };

    if session.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        print!("{}", render(&info));
    }
    Ok(())
}

fn grant_line(out: &mut String, keyword: &str, grant: &PackageInfo) {
    if grant.targets.is_empty() {
        let _ = writeln!(out, "    {} {};", keyword, grant.package);
    } else {
        let _ = writeln!(
            out,
            "    {} {} to {};",
            keyword,
            grant.package,
            grant.targets.join(", ")
        );
    }
}

/// Render the record as a module declaration
pub fn render(info: &ModuleInfo) -> String {
    let mut out = String::new();
    for annotation in &info.annotations {
        let _ = writeln!(out, "@{}", annotation);
    }
    if info.deprecated && !info.annotations.iter().any(|a| a == "Deprecated") {
        out.push_str("@Deprecated\n");
    }
    let open = if info.open { "open " } else { "" };
    match &info.version {
        Some(version) => {
            let _ = writeln!(out, "{}module {} {{ // version {}", open, info.name, version);
        }
        None => {
            let _ = writeln!(out, "{}module {} {{", open, info.name);
        }
    }

    for requires in &info.requires {
        let mut modifiers = String::new();
        if requires.transitive {
            modifiers.push_str("transitive ");
        }
        if requires.is_static {
            modifiers.push_str("static ");
        }
        let mandated = if requires.mandated { " // mandated" } else { "" };
        let _ = writeln!(out, "    requires {}{};{}", modifiers, requires.module, mandated);
    }
    for grant in &info.exports {
        grant_line(&mut out, "exports", grant);
    }
    for grant in &info.opens {
        grant_line(&mut out, "opens", grant);
    }
    for service in &info.uses {
        let _ = writeln!(out, "    uses {};", service);
    }
    for provides in &info.provides {
        let _ = writeln!(
            out,
            "    provides {} with {};",
            provides.service,
            provides.implementations.join(", ")
        );
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_modules::{DescriptorBuilder, ModuleId, Requires};

    #[test]
    fn test_render_declaration() {
        let descriptor = DescriptorBuilder::new("app")
            .packages(["app.api", "app.model"])
            .requires(Requires::new("lib").transitive())
            .exports("app.api")
            .opens_to("app.model", ["lib"])
            .build()
            .unwrap();
        let info = ModuleInfo::from_descriptor(&descriptor, &ModuleId::new("java.base"));

        insta::assert_snapshot!(render(&info).trim_end(), @r###"
        module app {
            requires java.base; // mandated
            requires transitive lib;
            exports app.api;
            opens app.model to lib;
        }
        "###);
    }
}
