mod common;

use common::TestEnv;
use std::fs;

use fbdeploy::domain::ProvisionOutcome;
use fbdeploy::services::layout::provision_layout;
use fbdeploy::services::Console;
use fbdeploy::DeployError;

#[test]
fn provisioning_twice_is_idempotent() {
    let env = TestEnv::new();

    let first = provision_layout(&env.config, &Console::buffered()).unwrap();
    assert_eq!(first.created_count(), env.config.layout_dirs().len() + 1);

    let console = Console::buffered();
    let second = provision_layout(&env.config, &console).unwrap();
    assert_eq!(second.created_count(), 0);
    assert_eq!(
        second.proxy_config.as_ref().map(|e| e.outcome),
        Some(ProvisionOutcome::AlreadyExists)
    );
    let out = console.contents();
    assert_eq!(
        out.matches("already exists").count(),
        env.config.layout_dirs().len() + 1
    );
}

#[test]
fn custom_caddyfile_is_preserved_byte_for_byte() {
    let env = TestEnv::new();
    let custom = b"# hand edited\r\nfiles.example.com {\n\treverse_proxy filebrowser:8080\n\tencode gzip\n}\n";
    fs::create_dir_all(env.config.caddy_dir()).unwrap();
    fs::write(env.caddyfile(), custom).unwrap();

    provision_layout(&env.config, &Console::buffered()).unwrap();
    provision_layout(&env.config, &Console::buffered()).unwrap();

    assert_eq!(fs::read(env.caddyfile()).unwrap(), custom.to_vec());
}

#[test]
fn extra_hostnames_get_their_own_block() {
    let mut env = TestEnv::new();
    env.config.hostname = "files.example.org".to_string();
    env.config.extra_hostnames = vec!["share.example.org".to_string()];
    env.config.app_port = 8080;

    provision_layout(&env.config, &Console::buffered()).unwrap();

    let caddyfile = fs::read_to_string(env.caddyfile()).unwrap();
    assert!(caddyfile.contains("files.example.org {"));
    assert!(caddyfile.contains("share.example.org {"));
    assert_eq!(caddyfile.matches("reverse_proxy filebrowser:8080").count(), 2);
}

#[test]
fn file_in_place_of_directory_is_an_error() {
    let env = TestEnv::new();
    fs::write(env.base.join("caddy"), "oops").unwrap();

    let err = provision_layout(&env.config, &Console::buffered()).unwrap_err();
    assert!(matches!(err, DeployError::Layout { .. }));
}
