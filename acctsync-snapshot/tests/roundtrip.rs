use acctsync_policy::{parse_plain_json, Account, AccountData, BucketPolicy, Group, InlinePolicy, InstanceProfile, ManagedPolicy, Role, User};

fn sample_account() -> AccountData {
    let mut data = AccountData::new(Account::new("123456789012", Some("prod".into())));

    data.users.push(User {
        name: "alice".into(),
        path: "/".into(),
        groups: ["admins".into()].into_iter().collect(),
        inline_policies: vec![InlinePolicy {
            name: "inline".into(),
            policy: parse_plain_json(r#"{"Action":"s3:Get"}"#).unwrap(),
        }],
        ..Default::default()
    });

    data.groups.push(Group {
        name: "admins".into(),
        path: "/".into(),
        inline_policies: Vec::new(),
        attached_policy_refs: ["arn:aws:iam::aws:policy/AdministratorAccess".into()]
            .into_iter()
            .collect(),
    });

    data.roles.push(Role {
        name: "deploy".into(),
        path: "/".into(),
        assume_role_policy: parse_plain_json(r#"{"Effect":"Allow"}"#).unwrap(),
        inline_policies: Vec::new(),
        attached_policy_refs: Default::default(),
        description: Some("deploy role".into()),
    });

    data.policies.push(ManagedPolicy {
        name: "test".into(),
        path: "/".into(),
        policy: parse_plain_json(r#"{"Action":["s3:Get","s3:Put"]}"#).unwrap(),
        description: None,
        version_metadata: Default::default(),
    });

    data.instance_profiles.push(InstanceProfile {
        name: "profile".into(),
        path: "/".into(),
        roles: vec!["deploy".into()],
    });

    data.bucket_policies.push(BucketPolicy {
        bucket_name: "my-bucket".into(),
        policy: parse_plain_json(r#"{"Effect":"Allow"}"#).unwrap(),
    });

    data
}

#[test]
fn load_of_dump_matches_the_original_account() {
    let dir = tempfile::tempdir().unwrap();
    let original = sample_account();

    acctsync_snapshot::dump(dir.path(), std::slice::from_ref(&original), false).unwrap();
    let loaded = acctsync_snapshot::load(dir.path(), "dev").unwrap();

    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].account, original.account);
    assert_eq!(loaded[0].users, original.users);
    assert_eq!(loaded[0].groups, original.groups);
    assert_eq!(loaded[0].roles, original.roles);
    assert_eq!(loaded[0].policies, original.policies);
    assert_eq!(loaded[0].instance_profiles, original.instance_profiles);
    assert_eq!(loaded[0].bucket_policies, original.bucket_policies);
}

#[test]
fn dump_with_delete_removes_stale_account_subtree() {
    let dir = tempfile::tempdir().unwrap();
    let original = sample_account();
    acctsync_snapshot::dump(dir.path(), std::slice::from_ref(&original), false).unwrap();

    let mut trimmed = original.clone();
    trimmed.users.clear();
    acctsync_snapshot::dump(dir.path(), std::slice::from_ref(&trimmed), true).unwrap();

    let loaded = acctsync_snapshot::load(dir.path(), "dev").unwrap();
    assert_eq!(loaded.len(), 1);
    assert!(loaded[0].users.is_empty());
}
