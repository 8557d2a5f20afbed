//! Flat task list to nested forest.

use std::collections::HashMap;

use serde::Serialize;

use crate::model::task::Task;

/// A task placed in the tree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskNode {
    #[serde(flatten)]
    pub task: Task,
    pub children: Vec<TaskNode>,
    /// Distance from the root (roots are 0)
    pub level: usize,
    /// Last in its sibling group. Only used to pick connector glyphs.
    pub is_last_in_level: bool,
}

/// Nest `tasks` by their parent links.
///
/// Siblings keep their input order. A task whose parent is not in the input
/// (filtered out, or already deleted) is promoted to a root, as is a task
/// naming itself as parent. Tasks caught in a longer parent cycle are not
/// reachable from any root and are left out.
pub fn build_forest<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Vec<TaskNode> {
    let tasks: Vec<&Task> = tasks.into_iter().collect();
    let n = tasks.len();
    let index: HashMap<&str, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (t.id.as_str(), i))
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut roots = Vec::new();
    for (i, task) in tasks.iter().enumerate() {
        match task.parent_id.as_deref().and_then(|p| index.get(p)) {
            Some(&p) if p != i => children[p].push(i),
            _ => roots.push(i),
        }
    }

    // Pre-order walk assigning levels and last-sibling flags
    let mut level = vec![0usize; n];
    let mut last = vec![false; n];
    let mut visited = vec![false; n];
    let mut preorder = Vec::with_capacity(n);
    if let Some(&r) = roots.last() {
        last[r] = true;
    }
    let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
    while let Some(i) = stack.pop() {
        if std::mem::replace(&mut visited[i], true) {
            continue;
        }
        preorder.push(i);
        if let Some(&c) = children[i].last() {
            last[c] = true;
        }
        for &c in children[i].iter().rev() {
            level[c] = level[i] + 1;
            stack.push(c);
        }
    }

    // Assemble bottom-up: in reverse pre-order every child is built before its parent
    let mut built: Vec<Option<TaskNode>> = (0..n).map(|_| None).collect();
    for &i in preorder.iter().rev() {
        let kids = children[i]
            .iter()
            .filter_map(|&c| built[c].take())
            .collect();
        built[i] = Some(TaskNode {
            task: tasks[i].clone(),
            children: kids,
            level: level[i],
            is_last_in_level: last[i],
        });
    }
    roots.iter().filter_map(|&r| built[r].take()).collect()
}

/// [`build_forest`] over the tasks of one project
pub fn build_project_forest(tasks: &[Task], project_id: &str) -> Vec<TaskNode> {
    build_forest(tasks.iter().filter(|t| t.project_id == project_id))
}

/// One line of a rendered tree
#[derive(Debug)]
pub struct TreeRow<'a> {
    pub node: &'a TaskNode,
    /// Connector glyphs to print before the row, e.g. `│  └─ `
    pub prefix: String,
}

/// Pre-order rows with connector prefixes. Roots get no connector.
pub fn flatten(forest: &[TaskNode]) -> Vec<TreeRow<'_>> {
    let mut rows = Vec::new();
    // (node, guide lines inherited from its ancestors)
    let mut stack: Vec<(&TaskNode, String)> =
        forest.iter().rev().map(|n| (n, String::new())).collect();

    while let Some((node, guide)) = stack.pop() {
        let (prefix, child_guide) = if node.level == 0 {
            (String::new(), String::new())
        } else if node.is_last_in_level {
            (format!("{}└─ ", guide), format!("{}   ", guide))
        } else {
            (format!("{}├─ ", guide), format!("{}│  ", guide))
        };
        for child in node.children.iter().rev() {
            stack.push((child, child_guide.clone()));
        }
        rows.push(TreeRow { node, prefix });
    }
    rows
}

/// Number of nodes in the forest
pub fn count_nodes(forest: &[TaskNode]) -> usize {
    let mut count = 0;
    let mut stack: Vec<&TaskNode> = forest.iter().collect();
    while let Some(node) = stack.pop() {
        count += 1;
        stack.extend(node.children.iter());
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::store_io::seed_data;
    use crate::model::task::{Priority, TaskStatus};
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    fn task(id: &str, parent_id: Option<&str>) -> Task {
        task_in("P1", id, parent_id)
    }

    fn task_in(project_id: &str, id: &str, parent_id: Option<&str>) -> Task {
        Task {
            id: id.to_string(),
            project_id: project_id.to_string(),
            parent_id: parent_id.map(str::to_string),
            title: format!("Task {}", id),
            description: String::new(),
            status: TaskStatus::NotStarted,
            priority: Priority::Low,
            progress: 0,
            estimate: None,
            budget: None,
        }
    }

    fn shape(nodes: &[TaskNode]) -> Vec<(String, usize, bool, usize)> {
        flatten(nodes)
            .iter()
            .map(|r| {
                (
                    r.node.task.id.clone(),
                    r.node.level,
                    r.node.is_last_in_level,
                    r.node.children.len(),
                )
            })
            .collect()
    }

    #[test]
    fn chain_nests_with_levels() {
        let tasks = vec![task("1", None), task("2", Some("1")), task("3", Some("2"))];
        let forest = build_forest(&tasks);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].task.id, "1");
        assert_eq!(forest[0].level, 0);
        assert_eq!(forest[0].children[0].task.id, "2");
        assert_eq!(forest[0].children[0].level, 1);
        assert_eq!(forest[0].children[0].children[0].task.id, "3");
        assert_eq!(forest[0].children[0].children[0].level, 2);
    }

    #[test]
    fn roots_keep_input_order() {
        let tasks = vec![task("c", None), task("a", None), task("b", None)];
        let forest = build_forest(&tasks);
        let ids: Vec<&str> = forest.iter().map(|n| n.task.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        let last: Vec<bool> = forest.iter().map(|n| n.is_last_in_level).collect();
        assert_eq!(last, vec![false, false, true]);
    }

    #[test]
    fn children_listed_before_parent_still_attach() {
        let tasks = vec![task("2", Some("1")), task("3", Some("1")), task("1", None)];
        assert_eq!(
            shape(&build_forest(&tasks)),
            vec![
                ("1".to_string(), 0, true, 2),
                ("2".to_string(), 1, false, 0),
                ("3".to_string(), 1, true, 0),
            ]
        );
    }

    #[test]
    fn orphans_become_roots() {
        let tasks = vec![task("1", None), task("2", Some("gone"))];
        let forest = build_forest(&tasks);
        assert_eq!(forest.len(), 2);
        assert_eq!(forest[1].task.id, "2");
        assert_eq!(forest[1].level, 0);
        assert!(forest[1].is_last_in_level);
        // The task itself is unchanged
        assert_eq!(forest[1].task.parent_id.as_deref(), Some("gone"));
    }

    #[test]
    fn project_filter_orphans_cross_project_children() {
        let tasks = vec![
            task_in("P1", "1", None),
            task_in("P2", "2", Some("1")),
            task_in("P2", "3", Some("2")),
        ];
        let forest = build_project_forest(&tasks, "P2");
        assert_eq!(
            shape(&forest),
            vec![("2".to_string(), 0, true, 1), ("3".to_string(), 1, true, 0)]
        );
    }

    #[test]
    fn self_parent_is_root_and_cycles_drop_out() {
        let tasks = vec![
            task("1", Some("1")),
            task("2", Some("3")),
            task("3", Some("2")),
        ];
        let forest = build_forest(&tasks);
        assert_eq!(shape(&forest), vec![("1".to_string(), 0, true, 0)]);
    }

    #[test]
    fn levels_and_last_flags_hold_on_seed() {
        let data = seed_data().unwrap();
        let forest = build_forest(&data.tasks);
        assert_eq!(count_nodes(&forest), data.tasks.len());

        let by_id: HashMap<&str, &Task> =
            data.tasks.iter().map(|t| (t.id.as_str(), t)).collect();
        let mut groups = vec![forest.as_slice()];
        while let Some(group) = groups.pop() {
            let flagged: Vec<usize> = group
                .iter()
                .enumerate()
                .filter(|(_, n)| n.is_last_in_level)
                .map(|(i, _)| i)
                .collect();
            assert_eq!(flagged, vec![group.len() - 1]);
            for node in group {
                // level == number of parent hops to a root
                let mut hops = 0;
                let mut current = node.task.parent_id.as_deref();
                while let Some(p) = current {
                    hops += 1;
                    current = by_id[p].parent_id.as_deref();
                }
                assert_eq!(node.level, hops);
                if !node.children.is_empty() {
                    groups.push(node.children.as_slice());
                }
            }
        }
    }

    #[test]
    fn serializes_camel_case_flattened() {
        let tasks = vec![task("1", None)];
        let value = serde_json::to_value(build_forest(&tasks)).unwrap();
        assert_eq!(value[0]["id"], "1");
        assert_eq!(value[0]["projectId"], "P1");
        assert_eq!(value[0]["isLastInLevel"], true);
        assert_eq!(value[0]["level"], 0);
        assert!(value[0]["children"].as_array().unwrap().is_empty());
    }

    #[test]
    fn flatten_draws_connectors() {
        let tasks = vec![
            task("1", None),
            task("2", Some("1")),
            task("3", Some("2")),
            task("4", Some("1")),
            task("5", None),
            task("6", Some("5")),
        ];
        let forest = build_forest(&tasks);
        let rendered = flatten(&forest)
            .iter()
            .map(|r| format!("{}{}", r.prefix, r.node.task.title))
            .collect::<Vec<_>>()
            .join("\n");
        assert_snapshot!(rendered, @r"
        Task 1
        ├─ Task 2
        │  └─ Task 3
        └─ Task 4
        Task 5
        └─ Task 6
        ");
    }

    #[test]
    fn empty_input_is_empty_forest() {
        assert!(build_forest(&Vec::<Task>::new()).is_empty());
        assert!(flatten(&[]).is_empty());
    }
}
