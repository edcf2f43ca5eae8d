//! Root route tree selection.
//!
//! The root is the application the server actually serves: a route tree
//! that no other tree mounts. A project may declare several unmounted apps
//! (helpers, tests, leftovers); the one reaching the most entries through
//! its mounts wins, ties broken by the smallest identifier so the choice is
//! stable across runs.

use sa_core::{
    FxHashSet, ResourceManager, RouteTree, RouteTreeEntry, RouteTreeId, RouteTreeReference,
};

/// Picks the root route tree of an extraction, if there is one.
///
/// # Examples
///
/// ```
/// use sa_core::{ResourceManager, RouteTreeProps};
/// use sa_monitor::analyze;
///
/// let mut manager = ResourceManager::new("/p");
/// assert!(analyze(&manager).is_none());
///
/// let app = manager.create_route_tree(RouteTreeProps {
///     file_name: "/p/src/index.ts".into(),
///     position: 6,
///     name: "app".to_owned(),
///     base_path: None,
/// });
/// assert_eq!(analyze(&manager).map(|root| &root.id), Some(&app.id));
/// ```
#[must_use]
pub fn analyze(manager: &ResourceManager) -> Option<&RouteTree> {
    let mounted: FxHashSet<&RouteTreeId> = manager
        .resources_of::<RouteTreeReference>()
        .filter_map(|mount| mount.target_id.as_ref())
        .collect();

    manager
        .resources_of::<RouteTree>()
        .filter(|tree| !mounted.contains(&tree.id))
        .map(|tree| (reachable_entries(manager, tree), tree))
        .max_by(|(reach_a, a), (reach_b, b)| {
            reach_a.cmp(reach_b).then_with(|| b.id.cmp(&a.id))
        })
        .map(|(_, tree)| tree)
}

/// Counts the entries of `root` and of every tree mounted below it.
fn reachable_entries(manager: &ResourceManager, root: &RouteTree) -> usize {
    let mut visited: FxHashSet<&RouteTreeId> = FxHashSet::default();
    let mut stack = vec![root];
    let mut count = 0;

    while let Some(tree) = stack.pop() {
        if !visited.insert(&tree.id) {
            continue;
        }
        for entry in manager.route_tree_entries(&tree.id) {
            count += 1;
            if let RouteTreeEntry::Mount(mount) = entry {
                if let Some(target) = mount
                    .target_id
                    .as_ref()
                    .and_then(|id| manager.get_resource(id))
                {
                    stack.push(target);
                }
            }
        }
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use sa_core::{RouteEntryProps, RouteTreeProps, RouteTreeReferenceProps};

    fn tree(manager: &mut ResourceManager, file: &str, position: u32) -> RouteTree {
        manager.create_route_tree(RouteTreeProps {
            file_name: format!("/p/src/{file}").into(),
            position,
            name: "app".to_owned(),
            base_path: None,
        })
    }

    fn route(manager: &mut ResourceManager, tree: &RouteTree, position: u32) {
        let entry = manager.create_route_entry(RouteEntryProps {
            file_name: tree.file_name.clone(),
            position,
            method: "GET".to_owned(),
            path: "/".to_owned(),
            route_tree_id: tree.id.clone(),
            sources: Vec::new(),
        });
        manager
            .add_entry_to_route_tree(&tree.id, entry.id.as_untyped().clone())
            .expect("tree exists");
    }

    fn mount(manager: &mut ResourceManager, parent: &RouteTree, child: &RouteTree, position: u32) {
        let mount = manager.create_route_tree_reference(RouteTreeReferenceProps {
            file_name: parent.file_name.clone(),
            position,
            path: "/child".to_owned(),
            route_tree_id: parent.id.clone(),
            target_id: Some(child.id.clone()),
        });
        manager
            .add_entry_to_route_tree(&parent.id, mount.id.as_untyped().clone())
            .expect("tree exists");
    }

    #[test]
    fn test_mounted_trees_are_not_roots() {
        let mut manager = ResourceManager::new("/p");
        let users = tree(&mut manager, "users.ts", 10);
        let app = tree(&mut manager, "index.ts", 10);
        route(&mut manager, &users, 40);
        mount(&mut manager, &app, &users, 60);

        assert_eq!(analyze(&manager).map(|root| &root.id), Some(&app.id));
    }

    #[test]
    fn test_largest_unmounted_tree_wins() {
        let mut manager = ResourceManager::new("/p");
        let helper = tree(&mut manager, "a-helper.ts", 10);
        let app = tree(&mut manager, "index.ts", 10);
        let users = tree(&mut manager, "users.ts", 10);
        route(&mut manager, &helper, 30);
        route(&mut manager, &users, 30);
        route(&mut manager, &users, 50);
        mount(&mut manager, &app, &users, 80);

        assert_eq!(analyze(&manager).map(|root| &root.id), Some(&app.id));
    }

    #[test]
    fn test_tie_prefers_smallest_id() {
        let mut manager = ResourceManager::new("/p");
        let b = tree(&mut manager, "b.ts", 10);
        let a = tree(&mut manager, "a.ts", 10);
        route(&mut manager, &a, 20);
        route(&mut manager, &b, 20);

        assert_eq!(analyze(&manager).map(|root| &root.id), Some(&a.id));
    }

    #[test]
    fn test_mount_cycle_has_no_root() {
        let mut manager = ResourceManager::new("/p");
        let a = tree(&mut manager, "a.ts", 10);
        let b = tree(&mut manager, "b.ts", 10);
        mount(&mut manager, &a, &b, 20);
        mount(&mut manager, &b, &a, 20);

        assert!(analyze(&manager).is_none());
    }
}
