use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use tokio::sync::Mutex;
use zip::write::SimpleFileOptions;

use yamcl_lib::commands;
use yamcl_lib::core::auth::LaunchAccountProfile;
use yamcl_lib::core::binary::BinaryKey;
use yamcl_lib::core::downloader::sha1_hex;
use yamcl_lib::core::error::{LauncherError, LauncherResult};
use yamcl_lib::core::platform::{Arch, Family, Platform};
use yamcl_lib::core::remote::{ByteStream, Origin, RemoteStore, RemoteUrl};
use yamcl_lib::core::state::{AppState, LauncherConfig};

#[derive(Default)]
struct Origins {
    bodies: StdMutex<HashMap<String, Vec<u8>>>,
    requests: AtomicUsize,
}

impl Origins {
    fn serve(&self, url: &RemoteUrl, body: impl Into<Vec<u8>>) {
        self.bodies.lock().unwrap().insert(url.to_string(), body.into());
    }

    fn serve_verified(&self, url: &RemoteUrl, body: impl Into<Vec<u8>>) {
        let body = body.into();
        self.serve(&url.companion_sha1(), sha1_hex(&body));
        self.serve(url, body);
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStore for Origins {
    async fn open(&self, url: &RemoteUrl) -> LauncherResult<ByteStream> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let body = self
            .bodies
            .lock()
            .unwrap()
            .get(&url.to_string())
            .cloned()
            .ok_or_else(|| LauncherError::DownloadFailed {
                url: url.to_string(),
                status: 404,
            })?;
        Ok(stream::iter(vec![Ok(body)]).boxed())
    }
}

fn native_jar(library: &str) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    writer.start_file(library, options).unwrap();
    writer.write_all(b"native code").unwrap();
    writer.start_file("META-INF/MANIFEST.MF", options).unwrap();
    writer.write_all(b"Manifest-Version: 1.0").unwrap();
    writer.finish().unwrap().into_inner()
}

fn libraries_url(path: &str) -> RemoteUrl {
    RemoteUrl::new(Origin::Libraries, path.split('/'))
}

fn serve_release(origins: &Origins) {
    let manifest = serde_json::json!({
        "id": "1.7.10",
        "minimumLauncherVersion": 13,
        "mainClass": "net.minecraft.client.main.Main",
        "minecraftArguments": "--username ${auth_player_name} --version ${version_name} --gameDir ${game_directory} --assetsDir ${game_assets} --assetIndex ${assets_index_name}",
        "assets": "1.7.10",
        "libraries": [
            { "name": "net.sf.jopt-simple:jopt-simple:4.5" },
            {
                "name": "org.lwjgl.lwjgl:lwjgl-platform:2.9.1",
                "natives": { "linux": "natives-linux-${arch}", "windows": "natives-windows-${arch}" },
                "extract": { "exclude": ["META-INF/"] },
                "rules": [{ "action": "allow" }, { "action": "disallow", "os": { "name": "osx" } }]
            }
        ]
    });
    origins.serve_verified(
        &RemoteUrl::new(Origin::Download, ["versions", "1.7.10", "1.7.10.json"]),
        manifest.to_string(),
    );
    origins.serve_verified(
        &RemoteUrl::new(Origin::Download, ["versions", "1.7.10", "1.7.10.jar"]),
        "client jar",
    );
    origins.serve_verified(
        &libraries_url("net/sf/jopt-simple/jopt-simple/4.5/jopt-simple-4.5.jar"),
        "jopt",
    );
    for classifier in ["natives-linux-32", "natives-linux-64", "natives-windows-32", "natives-windows-64"] {
        origins.serve_verified(
            &libraries_url(&format!(
                "org/lwjgl/lwjgl/lwjgl-platform/2.9.1/lwjgl-platform-2.9.1-{classifier}.jar"
            )),
            native_jar(&format!("{classifier}.so")),
        );
    }

    let object = b"sound bytes".to_vec();
    let hash = sha1_hex(&object);
    origins.serve_verified(
        &RemoteUrl::new(Origin::Download, ["indexes", "1.7.10.json"]),
        serde_json::json!({ "objects": { "sounds/click.ogg": { "hash": hash, "size": object.len() } } })
            .to_string(),
    );
    origins.serve(
        &RemoteUrl::new(Origin::Resources, [hash[..2].to_string(), hash.clone()]),
        object,
    );
}

#[tokio::test]
async fn install_resolve_and_launch_release() {
    let dir: PathBuf = std::env::temp_dir().join(format!("yamcl-it-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);

    let origins = Arc::new(Origins::default());
    serve_release(&origins);

    let config = LauncherConfig {
        download_exclusive: false,
        platform_override: Some(Platform::new(Family::Linux, Arch::X64)),
        ..LauncherConfig::with_data_dir(&dir)
    };
    let state = Mutex::new(AppState::open_with_remote(config, origins.clone()).await.unwrap());
    let key = BinaryKey::vanilla("1.7.10");

    commands::install_version(&state, &key, None).await.unwrap();
    let lib = dir.join("lib/org/lwjgl/lwjgl/lwjgl-platform/2.9.1");
    assert!(lib.join("natives-linux-64/natives-linux-64.so").exists());
    assert!(lib.join("natives-linux-32").is_dir());
    assert!(lib.join("natives-windows-64").is_dir());
    assert!(!lib.join("natives-linux-64/META-INF").exists());

    let after_install = origins.requests();
    commands::install_version(&state, &key, None).await.unwrap();
    assert_eq!(origins.requests(), after_install);

    state.lock().await.profiles.add("survival").await.unwrap();
    let plan = commands::resolve_launch_plan(&state, &key, "survival", LaunchAccountProfile::offline("Steve"))
        .await
        .unwrap();

    assert_eq!(
        plan.classpath,
        vec![
            dir.join("lib/net/sf/jopt-simple/jopt-simple/4.5/jopt-simple-4.5.jar"),
            dir.join("bin/vanilla/1.7.10/1.7.10.jar"),
        ]
    );
    assert_eq!(plan.native_path, vec![lib.join("natives-linux-64")]);
    assert_eq!(plan.main_class, "net.minecraft.client.main.Main");
    let game_dir = dir.join("profile/survival");
    assert_eq!(plan.game_directory, game_dir);
    assert_eq!(
        plan.arguments,
        vec![
            "--username".to_string(),
            "Steve".to_string(),
            "--version".to_string(),
            "1.7.10".to_string(),
            "--gameDir".to_string(),
            game_dir.to_string_lossy().to_string(),
            "--assetsDir".to_string(),
            dir.join("assets/objects").to_string_lossy().to_string(),
            "--assetIndex".to_string(),
            "1.7.10".to_string(),
        ]
    );

    let cmd = plan.command(std::path::Path::new("java"), 1024);
    let args: Vec<String> = cmd.get_args().map(|a| a.to_string_lossy().to_string()).collect();
    assert_eq!(args[0], "-Xmx1024M");
    assert!(args.contains(&format!(
        "-Djava.library.path={}",
        lib.join("natives-linux-64").to_string_lossy()
    )));

    assert!(commands::check_data_integrity(&state).await.is_clean());

    let _ = std::fs::remove_dir_all(&dir);
}
