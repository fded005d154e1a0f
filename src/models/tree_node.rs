//! 通用树节点
//!
//! 子节点强引用，父节点弱引用，避免循环引用导致泄漏。

use parking_lot::RwLock;
use std::sync::{Arc, Weak};

pub struct TreeNode<T> {
    value: T,
    parent: RwLock<Weak<TreeNode<T>>>,
    children: RwLock<Vec<Arc<TreeNode<T>>>>,
}

impl<T> TreeNode<T> {
    pub fn new(value: T) -> Arc<Self> {
        Arc::new(Self {
            value,
            parent: RwLock::new(Weak::new()),
            children: RwLock::new(Vec::new()),
        })
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn parent(&self) -> Option<Arc<Self>> {
        self.parent.read().upgrade()
    }

    pub fn children(&self) -> Vec<Arc<Self>> {
        self.children.read().clone()
    }

    /// 没有父节点（或父节点已经被释放）
    pub fn is_root(&self) -> bool {
        self.parent().is_none()
    }

    pub fn root(self: &Arc<Self>) -> Arc<Self> {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// 添加子节点；子节点原来的父节点会先移除它
    pub fn add(self: &Arc<Self>, node: Arc<Self>) {
        if let Some(previous) = node.parent() {
            previous.remove(&node);
        }
        *node.parent.write() = Arc::downgrade(self);
        self.children.write().push(node);
    }

    /// 移除子节点（从后往前找第一个匹配），返回是否找到
    pub fn remove(&self, node: &Arc<Self>) -> bool {
        let removed = {
            let mut children = self.children.write();
            match children.iter().rposition(|child| Arc::ptr_eq(child, node)) {
                Some(index) => Some(children.remove(index)),
                None => None,
            }
        };
        match removed {
            Some(child) => {
                *child.parent.write() = Weak::new();
                true
            }
            None => false,
        }
    }

    /// 第一个满足条件的直接子节点
    pub fn find<F>(&self, evaluate: F) -> Option<Arc<Self>>
    where
        F: Fn(&TreeNode<T>) -> bool,
    {
        self.find_all(evaluate, 1).into_iter().next()
    }

    /// 满足条件的直接子节点，`max_nodes` 为 0 表示不限数量
    pub fn find_all<F>(&self, evaluate: F, max_nodes: usize) -> Vec<Arc<Self>>
    where
        F: Fn(&TreeNode<T>) -> bool,
    {
        let mut matching = Vec::new();
        for child in self.children.read().iter() {
            if evaluate(child) {
                matching.push(child.clone());
                if max_nodes > 0 && matching.len() >= max_nodes {
                    break;
                }
            }
        }
        matching
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for TreeNode<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeNode")
            .field("value", &self.value)
            .field("children", &self.children.read().len())
            .finish()
    }
}
