use std::collections::BTreeSet;

use serde::Serialize;

use crate::models::menu::MenuNode;

/// Group label for the node that is itself the dashboard root.
pub const DASHBOARD_GROUP: &str = "Dashboard";

/// Whether the current user may perform `code`.
///
/// Pre-order depth-first search; the first node carrying the code decides.
/// Codes that appear nowhere in the tree are denied.
pub fn resolve_permission(tree: &[MenuNode], code: &str) -> bool {
    find_access(tree, code).unwrap_or(false)
}

fn find_access(nodes: &[MenuNode], code: &str) -> Option<bool> {
    nodes.iter().find_map(|node| {
        node.actions
            .iter()
            .find(|action| action.code == code)
            .map(|action| action.access)
            .or_else(|| find_access(&node.children, code))
    })
}

/// One quick-open entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandEntry {
    pub id: String,
    pub name: String,
    pub href: String,
    pub icon: Option<String>,
    /// Name of the top-level ancestor.
    pub group: String,
}

/// Flattens the tree into quick-open entries, in tree order.
///
/// Group-only nodes (no route) produce no entry, but their descendants do
/// and are attributed to the same top-level group.
pub fn build_command_index(tree: &[MenuNode]) -> Vec<CommandEntry> {
    tree.iter()
        .flat_map(|root| {
            let group = if is_dashboard_root(root) {
                DASHBOARD_GROUP.to_string()
            } else {
                root.name.clone()
            };
            let mut entries = Vec::new();
            collect_entries(root, &group, &mut entries);
            entries
        })
        .collect()
}

fn is_dashboard_root(node: &MenuNode) -> bool {
    matches!(node.href(), Some("/") | Some("/dashboard"))
}

fn collect_entries(node: &MenuNode, group: &str, entries: &mut Vec<CommandEntry>) {
    if let Some(href) = node.href() {
        entries.push(CommandEntry {
            id: node.id.clone(),
            name: node.name.clone(),
            href: href.to_string(),
            icon: node.icon.clone(),
            group: group.to_string(),
        });
    }
    for child in &node.children {
        collect_entries(child, group, entries);
    }
}

/// Ids of the nodes to expand so the item for `path` is visible, outermost
/// first.
///
/// An exact href match wins; otherwise the longest href that is a prefix
/// of `path` on a `/` boundary (`/task` never matches `/tasks`). The
/// matched node itself is not included.
pub fn find_active_ancestors(tree: &[MenuNode], path: &str) -> Vec<String> {
    let path = normalize_path(path);
    let target = longest_match(tree, &path);
    target
        .and_then(|href| ancestor_chain(tree, &href))
        .unwrap_or_default()
}

fn ancestor_chain(nodes: &[MenuNode], href: &str) -> Option<Vec<String>> {
    nodes.iter().find_map(|node| {
        if node.href().map(normalize_path).as_deref() == Some(href) {
            return Some(Vec::new());
        }
        ancestor_chain(&node.children, href).map(|rest| {
            std::iter::once(node.id.clone())
                .chain(rest)
                .collect::<Vec<_>>()
        })
    })
}

fn longest_match(nodes: &[MenuNode], path: &str) -> Option<String> {
    nodes
        .iter()
        .flat_map(|node| {
            let own = node
                .href()
                .map(normalize_path)
                .filter(|href| path_matches(href, path));
            own.into_iter().chain(longest_match(&node.children, path))
        })
        .max_by_key(|href| href.len())
}

/// Whether a node routed at `href` is active for `path`.
pub fn path_matches(href: &str, path: &str) -> bool {
    if href == path {
        return true;
    }
    if href == "/" {
        return false;
    }
    path.strip_prefix(href)
        .is_some_and(|rest| rest.starts_with('/'))
}

fn normalize_path(path: &str) -> String {
    let path = path
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Sidebar expansion: what the user toggled, plus whatever must be open to
/// reveal the active route.
#[derive(Debug, Clone, Default)]
pub struct SidebarExpansion {
    toggled: BTreeSet<String>,
}

impl SidebarExpansion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self, id: &str) {
        if !self.toggled.remove(id) {
            self.toggled.insert(id.to_string());
        }
    }

    /// User toggles unioned with the active route's ancestors.
    pub fn expanded_for(&self, tree: &[MenuNode], path: &str) -> BTreeSet<String> {
        let mut expanded = self.toggled.clone();
        expanded.extend(find_active_ancestors(tree, path));
        expanded
    }

    pub fn is_expanded(&self, tree: &[MenuNode], path: &str, id: &str) -> bool {
        self.toggled.contains(id) || find_active_ancestors(tree, path).iter().any(|a| a == id)
    }
}

/// A user's menu tree with permission lookups.
#[derive(Debug, Clone, Default)]
pub struct Permissions {
    tree: Vec<MenuNode>,
}

impl Permissions {
    pub fn new(tree: Vec<MenuNode>) -> Self {
        Self { tree }
    }

    pub fn can(&self, code: &str) -> bool {
        resolve_permission(&self.tree, code)
    }

    pub fn tree(&self) -> &[MenuNode] {
        &self.tree
    }

    pub fn command_index(&self) -> Vec<CommandEntry> {
        build_command_index(&self.tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::menu::MenuAction;

    fn node(id: &str, url: &str, children: Vec<MenuNode>) -> MenuNode {
        MenuNode {
            id: id.to_string(),
            name: id.to_uppercase(),
            url: url.to_string(),
            icon: None,
            children,
            actions: Vec::new(),
        }
    }

    fn with_actions(mut node: MenuNode, actions: &[(&str, bool)]) -> MenuNode {
        node.actions = actions
            .iter()
            .map(|(code, access)| MenuAction {
                code: code.to_string(),
                access: *access,
            })
            .collect();
        node
    }

    #[test]
    fn empty_tree_denies_everything() {
        assert!(!resolve_permission(&[], "VIEW_USERS"));
    }

    #[test]
    fn nested_grant_is_found() {
        let tree = vec![node(
            "admin",
            "",
            vec![with_actions(node("users", "/users", vec![]), &[("VIEW_USERS", true)])],
        )];
        assert!(resolve_permission(&tree, "VIEW_USERS"));
        assert!(!resolve_permission(&tree, "DELETE_USERS"));
    }

    #[test]
    fn first_match_in_pre_order_wins() {
        let denied_first = vec![
            with_actions(
                node("a", "/a", vec![with_actions(node("a1", "/a/1", vec![]), &[("VIEW_USERS", true)])]),
                &[("VIEW_USERS", false)],
            ),
        ];
        assert!(!resolve_permission(&denied_first, "VIEW_USERS"));

        let child_before_sibling = vec![
            node("a", "/a", vec![with_actions(node("a1", "/a/1", vec![]), &[("VIEW_USERS", true)])]),
            with_actions(node("b", "/b", vec![]), &[("VIEW_USERS", false)]),
        ];
        assert!(resolve_permission(&child_before_sibling, "VIEW_USERS"));
    }

    #[test]
    fn command_index_skips_group_nodes_and_keeps_group() {
        let tree = vec![
            node("dashboard", "/dashboard", vec![]),
            node(
                "sales",
                "",
                vec![
                    node("pipeline", "/pipeline", vec![]),
                    node("reports", "", vec![node("visits", "/reports/visits", vec![])]),
                ],
            ),
        ];

        let index = build_command_index(&tree);
        let summary: Vec<(&str, &str)> = index
            .iter()
            .map(|e| (e.id.as_str(), e.group.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("dashboard", DASHBOARD_GROUP),
                ("pipeline", "SALES"),
                ("visits", "SALES"),
            ]
        );
    }

    #[test]
    fn active_ancestors_respect_segment_boundaries() {
        let tree = vec![
            node("sales", "", vec![node("pipeline", "/pipeline", vec![])]),
            node("archive", "", vec![node("pipeline-archive", "/pipeline-archive", vec![])]),
        ];

        assert_eq!(find_active_ancestors(&tree, "/pipeline/42"), vec!["sales"]);
        assert_eq!(find_active_ancestors(&tree, "/pipeline-archive"), vec!["archive"]);

        let tasks = vec![node("work", "", vec![node("tasks", "/tasks", vec![])])];
        assert!(find_active_ancestors(&tasks, "/task").is_empty());
    }

    #[test]
    fn deeper_exact_match_beats_shorter_prefix() {
        let tree = vec![node(
            "admin",
            "",
            vec![node(
                "masters",
                "/admin",
                vec![node("roles", "/admin/roles", vec![])],
            )],
        )];
        assert_eq!(
            find_active_ancestors(&tree, "/admin/roles/"),
            vec!["admin", "masters"]
        );
        assert_eq!(find_active_ancestors(&tree, "/admin/other"), vec!["admin"]);
    }

    #[test]
    fn root_only_matches_itself() {
        assert!(path_matches("/", "/"));
        assert!(!path_matches("/", "/tasks"));
    }

    #[test]
    fn sidebar_unions_toggles_with_active_chain() {
        let tree = vec![
            node("sales", "", vec![node("pipeline", "/pipeline", vec![])]),
            node("admin", "", vec![node("users", "/users", vec![])]),
        ];
        let mut sidebar = SidebarExpansion::new();
        sidebar.toggle("admin");

        let expanded = sidebar.expanded_for(&tree, "/pipeline");
        assert!(expanded.contains("admin"));
        assert!(expanded.contains("sales"));

        sidebar.toggle("admin");
        assert!(!sidebar.is_expanded(&tree, "/pipeline", "admin"));
        assert!(sidebar.is_expanded(&tree, "/pipeline", "sales"));
    }
}
