//! Alternate identities of an application

use std::collections::BTreeSet;
use tracing::{debug, instrument};

use super::{build_apps, scan, AppList, QueryContext};
use crate::app::{base_id, component_provides, App, Provide, RefineFlags};
use crate::error::Result;
use crate::silo::{Node, Silo};

const ID_PROVIDE: &str = "id";

fn names_id(provides: &BTreeSet<Provide>, id: &str) -> bool {
    provides
        .iter()
        .any(|p| p.kind == ID_PROVIDE && (p.value == id || base_id(&p.value) == base_id(id)))
}

/// Append components that are other identities of `app`, best matches first
///
/// A component is an alternate when it shares a provides token with `app`,
/// has the same base identifier, or when either side lists the other's
/// identifier under its `id` provides. Ranked by shared provides count.
#[instrument(skip(silo, ctx, list), fields(id = app.id()))]
pub fn add_alternates(silo: &Silo, ctx: &QueryContext, app: &App, list: &mut AppList) -> Result<()> {
    // records built without PROVIDES still get matched by their stored tokens
    let looked_up;
    let provides = if app.provides().is_empty() && !app.refined().contains(RefineFlags::PROVIDES) {
        looked_up = silo
            .find_by_id(app.id())
            .map(component_provides)
            .unwrap_or_default();
        &looked_up
    } else {
        app.provides()
    };

    let mut alternates: Vec<(usize, &Node)> = Vec::new();
    scan(silo, ctx, |_, id, node| {
        if id == app.id() {
            return;
        }
        let theirs = component_provides(node);
        let shared = theirs.intersection(provides).count();
        let related = shared > 0
            || base_id(id) == app.base_id()
            || names_id(&theirs, app.id())
            || names_id(provides, id);
        if related {
            alternates.push((shared, node));
        }
    })?;
    alternates.sort_by(|a, b| b.0.cmp(&a.0));

    let added = list.extend(build_apps(ctx, alternates.into_iter().map(|(_, n)| n))?);
    debug!(added, "Resolved alternates");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::create_application;
    use crate::query::fixtures::silo_from_yaml;

    const CATALOG: &str = r#"
- ID: org.example.Viewer
  Provides:
    mediatypes: [image/png, image/jpeg]
    binaries: [viewer]
- ID: org.example.Gallery
  Provides:
    mediatypes: [image/png]
- ID: org.example.Viewer.desktop
- ID: org.example.Photos
  Provides:
    mediatypes: [image/png, image/jpeg]
- ID: org.example.Renamed
  Provides:
    ids: [org.example.Viewer]
- ID: org.example.Unrelated
  Provides:
    mediatypes: [text/plain]
"#;

    fn lookup(silo: &Silo, id: &str) -> App {
        create_application(silo.find_by_id(id).unwrap(), &Default::default()).unwrap()
    }

    #[test]
    fn test_alternates_ranked_by_shared_provides() {
        let silo = silo_from_yaml(CATALOG);
        let viewer = lookup(&silo, "org.example.Viewer");

        let mut list = AppList::new();
        add_alternates(&silo, &QueryContext::default(), &viewer, &mut list).unwrap();
        assert_eq!(
            list.ids(),
            vec![
                "org.example.Photos",
                "org.example.Gallery",
                "org.example.Viewer.desktop",
                "org.example.Renamed",
            ]
        );
        assert!(!list.contains("org.example.Viewer"));
    }

    #[test]
    fn test_id_provides_match_in_both_directions() {
        let silo = silo_from_yaml(CATALOG);
        let renamed = lookup(&silo, "org.example.Renamed");

        let mut list = AppList::new();
        add_alternates(&silo, &QueryContext::default(), &renamed, &mut list).unwrap();
        // Renamed names Viewer; Viewer.desktop shares Viewer's base id
        assert_eq!(
            list.ids(),
            vec!["org.example.Viewer", "org.example.Viewer.desktop"]
        );
    }

    #[test]
    fn test_unrefined_record_uses_stored_provides() {
        let silo = silo_from_yaml(CATALOG);
        let bare = App::new("org.example.Gallery", crate::silo::ComponentKind::Generic);

        let mut list = AppList::new();
        add_alternates(&silo, &QueryContext::default(), &bare, &mut list).unwrap();
        assert_eq!(list.ids(), vec!["org.example.Viewer", "org.example.Photos"]);
    }

    #[test]
    fn test_unknown_app_without_provides_finds_nothing() {
        let silo = silo_from_yaml(CATALOG);
        let stranger = App::new("org.example.Stranger", crate::silo::ComponentKind::Generic);

        let mut list = AppList::new();
        add_alternates(&silo, &QueryContext::default(), &stranger, &mut list).unwrap();
        assert!(list.is_empty());
    }
}
