use std::fmt;

use serde::{Deserialize, Serialize};

use super::AccountError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub u32);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Root,
    Asset,
    Cash,
    Bank,
    Receivable,
    Liability,
    Equity,
    Income,
    Expense,
}

/// Lookup capability the path resolver needs from an account tree.
pub trait AccountNode {
    fn name(&self) -> &str;

    /// Direct child with exactly this name, if any.
    fn lookup_by_name(&self, name: &str) -> Option<&Self>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub kind: AccountKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Account>,
}

impl Account {
    pub fn new(id: u32, name: &str, kind: AccountKind) -> Account {
        Account {
            id: AccountId(id),
            name: name.to_string(),
            kind,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: Account) -> Account {
        self.children.push(child);
        self
    }

    pub fn find(&self, id: AccountId) -> Option<&Account> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Colon-separated path of `id` below this node, without this node's own name.
    pub fn path_of(&self, id: AccountId) -> Option<String> {
        if self.id == id {
            return Some(String::new());
        }
        self.children.iter().find_map(|child| {
            child.path_of(id).map(|rest| {
                if rest.is_empty() {
                    child.name.clone()
                } else {
                    format!("{}:{}", child.name, rest)
                }
            })
        })
    }

    pub fn descendants(&self) -> Vec<&Account> {
        let mut accounts = Vec::new();
        let mut pending = vec![self];
        while let Some(account) = pending.pop() {
            accounts.push(account);
            pending.extend(account.children.iter().rev());
        }
        accounts
    }
}

impl AccountNode for Account {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup_by_name(&self, name: &str) -> Option<&Account> {
        self.children.iter().find(|child| child.name == name)
    }
}

/// Walks a colon-delimited path such as `"Assets:Current Assets:Petty Cash"` down from `root`.
///
/// Every segment must name a direct child exactly. The first missing segment ends the walk
/// with [`AccountError::NotFound`]; nothing past it is looked at.
pub fn resolve<'a, N: AccountNode>(root: &'a N, path: &str) -> Result<&'a N, AccountError> {
    let mut node = root;
    for segment in path.split(':') {
        let child = if segment.is_empty() { None } else { node.lookup_by_name(segment) };
        node = child.ok_or_else(|| AccountError::NotFound {
            path: path.to_string(),
            segment: segment.to_string(),
        })?;
    }
    Ok(node)
}
