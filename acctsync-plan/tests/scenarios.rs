use acctsync_plan::{plan, NoCredentials};
use acctsync_policy::{parse_plain_json, Account, AccountData, ManagedPolicy, Role};

fn account() -> Account {
    Account::new("123456789012", None)
}

#[tokio::test]
async fn policy_is_detached_before_the_role_and_policy_it_was_attached_to_are_deleted() {
    let mut from = AccountData::new(account());
    from.roles.push(Role {
        name: "testrole".into(),
        path: "/".into(),
        assume_role_policy: parse_plain_json(r#"{"Effect":"Allow"}"#).unwrap(),
        inline_policies: Vec::new(),
        // A locally-owned policy is stored as a bare name, not a full
        // ARN, the way fetch/load actually produce it.
        attached_policy_refs: ["test".into()].into_iter().collect(),
        description: None,
    });
    from.policies.push(ManagedPolicy {
        name: "test".into(),
        path: "/".into(),
        policy: parse_plain_json(r#"{"Effect":"Allow"}"#).unwrap(),
        description: None,
        version_metadata: Default::default(),
    });

    let to = AccountData::new(account());

    let cmds = plan(&from, &to, &NoCredentials).await.unwrap();
    let rendered: Vec<String> = cmds.iter().map(ToString::to_string).collect();

    let detach = rendered.iter().position(|c| c.contains("detach-role-policy")).unwrap();
    let delete_role = rendered.iter().position(|c| c.contains("delete-role ")).unwrap();
    let delete_policy = rendered
        .iter()
        .position(|c| c.contains("delete-policy ") && !c.contains("delete-policy-version"))
        .unwrap();

    assert!(detach < delete_role, "plan was: {rendered:#?}");
    assert!(delete_role < delete_policy, "plan was: {rendered:#?}");

    let expected_arn = "arn:aws:iam::123456789012:policy/test";
    assert!(
        rendered[detach].contains(&format!("--policy-arn {expected_arn}")),
        "detach command should use the full policy ARN, not the bare name: {}",
        rendered[detach]
    );
    assert!(
        rendered[delete_policy].contains(&format!("--policy-arn {expected_arn}")),
        "delete-policy command should use the full policy ARN: {}",
        rendered[delete_policy]
    );
}

#[tokio::test]
async fn reconciling_identical_snapshots_produces_no_commands() {
    let data = {
        let mut d = AccountData::new(account());
        d.roles.push(Role {
            name: "stable".into(),
            path: "/".into(),
            assume_role_policy: parse_plain_json(r#"{"Effect":"Allow"}"#).unwrap(),
            inline_policies: Vec::new(),
            attached_policy_refs: Default::default(),
            description: None,
        });
        d
    };

    let cmds = plan(&data, &data.clone(), &NoCredentials).await.unwrap();
    assert!(cmds.is_empty(), "plan was: {cmds:#?}");
}
