//! Contains pure functions for collecting nodes along each XPath axis.

use crate::datasource::DataSourceNode;
use std::collections::HashSet;

fn add_node<'a, N: DataSourceNode<'a>>(node: N, seen: &mut HashSet<N>, results: &mut Vec<N>) {
    if seen.insert(node) {
        results.push(node);
    }
}

pub fn collect_self_nodes<'a, N: DataSourceNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    add_node(node, seen, results);
}

pub fn collect_child_nodes<'a, N: DataSourceNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    for child in node.children() {
        add_node(child, seen, results);
    }
}

pub fn collect_attribute_nodes<'a, N: DataSourceNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    for attr in node.attributes() {
        add_node(attr, seen, results);
    }
}

pub fn collect_descendant_nodes<'a, N: DataSourceNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    let mut queue: Vec<N> = node.children().collect();
    while let Some(current) = queue.pop() {
        add_node(current, seen, results);
        queue.extend(current.children());
    }
}

pub fn collect_descendant_or_self_nodes<'a, N: DataSourceNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    add_node(node, seen, results);
    collect_descendant_nodes(node, seen, results);
}

pub fn collect_parent_nodes<'a, N: DataSourceNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    if let Some(parent) = node.parent() {
        add_node(parent, seen, results);
    }
}

pub fn collect_ancestor_nodes<'a, N: DataSourceNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    let mut current = node.parent();
    while let Some(p) = current {
        add_node(p, seen, results);
        current = p.parent();
    }
}

pub fn collect_following_sibling_nodes<'a, N: DataSourceNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    if let Some(parent) = node.parent() {
        let mut found_self = false;
        for sibling in parent.children() {
            if found_self {
                add_node(sibling, seen, results);
            }
            if sibling == node {
                found_self = true;
            }
        }
    }
}

pub fn collect_preceding_sibling_nodes<'a, N: DataSourceNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    if let Some(parent) = node.parent() {
        let mut siblings = Vec::new();
        for sibling in parent.children() {
            if sibling == node {
                break;
            }
            siblings.push(sibling);
        }
        for sibling in siblings {
            add_node(sibling, seen, results);
        }
    }
}

pub fn collect_following_nodes<'a, N: DataSourceNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    let mut current = Some(node);
    while let Some(c) = current {
        let parent = c.parent();
        if let Some(p) = parent {
            let mut found_c = false;
            for sibling in p.children() {
                if found_c {
                    collect_descendant_or_self_nodes(sibling, seen, results);
                }
                if sibling == c {
                    found_c = true;
                }
            }
        }
        current = parent;
    }
}

pub fn collect_preceding_nodes<'a, N: DataSourceNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    let mut current = Some(node);
    while let Some(c) = current {
        let parent = c.parent();
        if let Some(p) = parent {
            for sibling in p.children() {
                if sibling == c {
                    break;
                }
                collect_descendant_or_self_nodes(sibling, seen, results);
            }
        }
        current = parent;
    }
}
