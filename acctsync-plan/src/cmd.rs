//! The plan's output type: an ordered list of literal provider CLI
//! invocations.
//!
//! Grounded on `original_source/iamy/awsdiff.go`'s `CmdList`/`Cmd.Addf` —
//! the Go version builds pre-formatted strings directly; here `Cmd`
//! keeps `program` and `args` separate so destructiveness detection
//! (second argument's verb) does not need to re-tokenize a string.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmd {
    pub program: String,
    pub args: Vec<String>,
}

impl Cmd {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Cmd {
            program: program.into(),
            args,
        }
    }

    pub fn aws(args: Vec<String>) -> Self {
        Cmd::new("aws", args)
    }

    /// A command is destructive iff its second argument (the `aws`
    /// subcommand's operation name, e.g. `delete-role`) begins with `de`
    /// or `remove`.
    pub fn is_destructive(&self) -> bool {
        self.args
            .get(1)
            .is_some_and(|verb| verb.starts_with("de") || verb.starts_with("remove"))
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.chars().any(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CmdList {
    cmds: Vec<Cmd>,
}

impl CmdList {
    pub fn new() -> Self {
        CmdList::default()
    }

    pub fn push(&mut self, cmd: Cmd) {
        self.cmds.push(cmd);
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = Cmd>) {
        self.cmds.extend(other);
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cmds.len()
    }

    pub fn destructive_count(&self) -> usize {
        self.cmds.iter().filter(|c| c.is_destructive()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cmd> {
        self.cmds.iter()
    }
}

impl IntoIterator for CmdList {
    type Item = Cmd;
    type IntoIter = std::vec::IntoIter<Cmd>;

    fn into_iter(self) -> Self::IntoIter {
        self.cmds.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_argument_starting_with_de_is_destructive() {
        let cmd = Cmd::aws(vec!["iam".into(), "delete-role".into(), "--role-name".into(), "x".into()]);
        assert!(cmd.is_destructive());
    }

    #[test]
    fn second_argument_starting_with_remove_is_destructive() {
        let cmd = Cmd::aws(vec![
            "iam".into(),
            "remove-user-from-group".into(),
            "--user-name".into(),
            "x".into(),
        ]);
        assert!(cmd.is_destructive());
    }

    #[test]
    fn create_and_update_verbs_are_not_destructive() {
        let create = Cmd::aws(vec!["iam".into(), "create-role".into()]);
        let update = Cmd::aws(vec!["iam".into(), "update-assume-role-policy".into()]);
        assert!(!create.is_destructive());
        assert!(!update.is_destructive());
    }

    #[test]
    fn display_single_quotes_args_with_whitespace() {
        let cmd = Cmd::aws(vec![
            "iam".into(),
            "create-policy".into(),
            "--policy-document".into(),
            r#"{"Version": "2012-10-17"}"#.into(),
        ]);
        let rendered = cmd.to_string();
        assert!(rendered.contains("'{\"Version\": \"2012-10-17\"}'"));
    }

    #[test]
    fn destructive_count_tallies_across_list() {
        let mut list = CmdList::new();
        list.push(Cmd::aws(vec!["iam".into(), "create-role".into()]));
        list.push(Cmd::aws(vec!["iam".into(), "delete-role".into()]));
        assert_eq!(list.len(), 2);
        assert_eq!(list.destructive_count(), 1);
    }
}
