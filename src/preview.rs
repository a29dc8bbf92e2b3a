use crate::reconcile::Outcome;
use colored::Colorize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Directory,
    File,
    Removed,
}

/// Represents a node in the tree (either file or directory).
#[derive(Debug)]
struct TreeNode {
    name: String,
    children: Vec<Rc<RefCell<TreeNode>>>,
    kind: NodeKind,
}
impl TreeNode {
    fn new(name: String, kind: NodeKind) -> Self {
        Self {
            name,
            children: Vec::new(),
            kind,
        }
    }
}

/// Build the directory tree from the outcome's paths, returning the root node.
/// Missing parent directories are created on the way down.
fn build_tree(outcome: &Outcome, destination: &Path) -> Rc<RefCell<TreeNode>> {
    let root_name = destination
        .file_name()
        .map(|os| os.to_string_lossy().to_string())
        .unwrap_or_else(|| destination.display().to_string());

    let root = Rc::new(RefCell::new(TreeNode::new(root_name, NodeKind::Directory)));

    // map relative directory path to node
    let mut lookup: HashMap<String, Rc<RefCell<TreeNode>>> = HashMap::new();

    let entries = outcome
        .files
        .paths()
        .map(|path| (path, NodeKind::File))
        .chain(
            outcome
                .migrated
                .iter()
                .map(|path| (path.as_str(), NodeKind::Removed)),
        );

    for (path, kind) in entries {
        let segments: Vec<&str> = path.split('/').collect();
        let Some((file_name, directories)) = segments.split_last() else {
            continue;
        };

        let mut parent = Rc::clone(&root);
        let mut current = String::new();

        for directory in directories {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(directory);

            let node = lookup
                .entry(current.clone())
                .or_insert_with(|| {
                    let node = Rc::new(RefCell::new(TreeNode::new(
                        directory.to_string(),
                        NodeKind::Directory,
                    )));
                    parent.borrow_mut().children.push(Rc::clone(&node));
                    node
                })
                .clone();

            parent = node;
        }

        parent
            .borrow_mut()
            .children
            .push(Rc::new(RefCell::new(TreeNode::new(file_name.to_string(), kind))));
    }

    root
}

/// Print the tree with a nice ASCII style.
fn print_tree(node: &Rc<RefCell<TreeNode>>, prefix: &str, is_last: bool) {
    let node_borrow = node.borrow();

    let connector = if is_last {
        "└── ".yellow()
    } else {
        "├── ".yellow()
    };
    let name = match node_borrow.kind {
        NodeKind::Directory => node_borrow.name.blue(),
        NodeKind::File => node_borrow.name.green(),
        NodeKind::Removed => node_borrow.name.red().strikethrough(),
    };
    println!("{}{}{}", prefix.yellow(), connector, name);

    let child_prefix = if is_last {
        format!("{}    ", prefix)
    } else {
        format!("{}│   ", prefix)
    };

    let len = node_borrow.children.len();
    for (i, child) in node_borrow.children.iter().enumerate() {
        let last = i == len - 1;
        print_tree(child, &child_prefix, last);
    }
}

pub fn preview_as_tree(outcome: &Outcome, destination: &Path) {
    let tree_root = build_tree(outcome, destination);

    println!(
        "Legend: {} = (directory), {} = (file), {} = (removed)",
        "blue".blue(),
        "green".green(),
        "red".red()
    );

    let fancy_prompt = format!(
        "{} {}\n",
        "┌─".bold().bright_blue(),
        "Preview".bold().bright_blue(),
    );

    println!("{}", fancy_prompt);

    print_tree(&tree_root, "", true);

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::FileSet;

    fn names(node: &Rc<RefCell<TreeNode>>) -> Vec<String> {
        node.borrow()
            .children
            .iter()
            .map(|child| child.borrow().name.clone())
            .collect()
    }

    #[test]
    fn intermediate_directories_are_created_once() {
        let mut files = FileSet::new();
        files.write("package.json", "");
        files.write("src/bin.ts", "");
        files.write("src/index.ts", "");

        let outcome = Outcome {
            files,
            renamed: Vec::new(),
            migrated: vec!["old.txt".to_string()],
            dist: "out".into(),
            written: false,
        };

        let root = build_tree(&outcome, Path::new("out"));
        assert_eq!(root.borrow().name, "out");
        assert_eq!(names(&root), vec!["package.json", "src", "old.txt"]);

        let src = Rc::clone(&root.borrow().children[1]);
        assert_eq!(names(&src), vec!["bin.ts", "index.ts"]);
        assert_eq!(root.borrow().children[2].borrow().kind, NodeKind::Removed);
    }
}
