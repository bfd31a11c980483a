//! SwiftDB 集成测试
//!
//! 测试配置、适配器与管理器之间的集成功能。

// 配置加载集成测试
#[cfg(test)]
mod config_tests {
    use std::sync::Arc;
    use swiftdb_config::{DbConfig, uri_env_key};
    use swiftdb_core::SwiftDbError;
    use swiftdb_core::testing::ScriptedDriver;
    use swiftdb_manager::DbManager;

    const CONFIG: &str = r#"
        [[adapters]]
        name = "main"
        kind = "mongo"

        [[adapters.connections]]
        name = "users"
        uri = "db-1:27017,db-2:27017/users"

        [[adapters.connections]]
        name = "orders"
        uri = "mongodb://db-1:27017/orders"

        [adapters.connections.options]
        replicaSet = "rs0"

        [[adapters]]
        name = "audit-log"
        kind = "mongo"

        [[adapters.connections]]
        name = "events"
        uri = "db-3:27017/events"
    "#;

    #[test]
    fn test_manager_from_config() {
        let config = DbConfig::from_toml_str(CONFIG).unwrap();
        let driver = ScriptedDriver::new("mongo").with_scheme("mongodb");
        let manager = DbManager::from_config(&config, [driver.shared()]).unwrap();

        let names: Vec<String> = manager.get_all_adapters().keys().cloned().collect();
        assert_eq!(names, vec!["main", "audit-log"]);

        let main = manager.get_adapter("main").unwrap();
        assert_eq!(main.connection_count(), 2);
        assert_eq!(
            main.get_connection_params("users").unwrap().uri(),
            "mongodb://db-1:27017,mongodb://db-2:27017/users"
        );
        let orders = main.get_connection_params("orders").unwrap();
        assert_eq!(orders.uri(), "mongodb://db-1:27017/orders");
        assert_eq!(orders.option("replicaSet"), Some("rs0"));
    }

    #[test]
    fn test_env_override_reaches_connection() {
        let key = uri_env_key("audit-log", "events");
        assert_eq!(key, "SWIFTDB_URI__AUDIT_LOG__EVENTS");

        unsafe { std::env::set_var(&key, "db-9:27017/events") };
        let config = DbConfig::from_toml_str(CONFIG)
            .unwrap()
            .load_with_env_override()
            .unwrap();
        unsafe { std::env::remove_var(&key) };

        let driver = ScriptedDriver::new("mongo");
        let manager = DbManager::from_config(&config, [driver.shared()]).unwrap();
        let audit = manager.get_adapter("audit-log").unwrap();
        assert_eq!(
            audit.get_connection_params("events").unwrap().uri(),
            "db-9:27017/events"
        );
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = DbConfig::from_toml_str(
            r#"
            [[adapters]]
            name = "main"
            kind = "mongo"

            [[adapters.connections]]
            name = "users"
            uri = ""
            "#,
        )
        .unwrap();
        let driver = ScriptedDriver::new("mongo");
        let manager = Arc::new(DbManager::new());
        manager.register_kind(driver.shared()).unwrap();

        let err = manager.load_config(&config).unwrap_err();
        assert!(matches!(err, SwiftDbError::Config(_)));
        assert_eq!(manager.adapter_count(), 0);
    }
}

// 生命周期集成测试
#[cfg(test)]
mod lifecycle_tests {
    use std::sync::Arc;
    use std::time::Duration;
    use swiftdb_core::testing::ScriptedDriver;
    use swiftdb_core::{ConnectionParams, ConnectionStatus, DriverError, SwiftDbErrorKind};
    use swiftdb_manager::DbManager;

    fn setup(driver: &ScriptedDriver) -> Arc<DbManager> {
        let manager = Arc::new(DbManager::new());
        manager.register_kind(driver.shared()).unwrap();
        let adapter = manager.create_adapter("mongo", Some("main")).unwrap();
        for name in ["a", "b", "c"] {
            adapter
                .create_connection(ConnectionParams::new(format!("host-{}/app", name)), Some(name))
                .unwrap();
        }
        manager
    }

    #[tokio::test]
    async fn test_partial_failure_then_retry() {
        let driver = ScriptedDriver::new("mongo");
        driver.fail_open("host-b", DriverError::with_code("ECONNREFUSED", "host-b:27017"));
        let manager = setup(&driver);

        let err = manager.connect().await.unwrap_err();
        assert_eq!(err.kind(), SwiftDbErrorKind::Multi);
        let multi = err.as_multi().unwrap();
        assert_eq!(multi.len(), 1);
        assert_eq!(multi.errors()[0].kind(), SwiftDbErrorKind::Connect);

        let main = manager.get_adapter("main").unwrap();
        assert!(main.is_connected("a").unwrap());
        assert!(!main.is_connected("b").unwrap());

        driver.clear_failures();
        manager.connect().await.unwrap();
        assert!(main.is_connected("b").unwrap());
        // a 与 c 已连接，重试只打开 b
        assert_eq!(driver.open_count(), 4);
    }

    #[tokio::test]
    async fn test_full_teardown() {
        let driver = ScriptedDriver::new("mongo");
        let manager = setup(&driver);
        manager.connect().await.unwrap();
        assert_eq!(driver.open_handles(), 3);

        manager.remove_all_adapters().await.unwrap();
        assert_eq!(manager.adapter_count(), 0);
        assert_eq!(driver.open_handles(), 0);
    }

    #[tokio::test]
    async fn test_server_side_drop_reconnects() {
        let driver = ScriptedDriver::new("mongo");
        let manager = setup(&driver);
        manager.connect().await.unwrap();

        assert_eq!(driver.drop_handles("host-a"), 1);
        let main = manager.get_adapter("main").unwrap();
        assert!(!main.is_connected("a").unwrap());

        manager.connect().await.unwrap();
        assert!(main.is_connected("a").unwrap());
        assert_eq!(driver.open_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_connects_share_one_driver_call() {
        let driver = ScriptedDriver::new("mongo").with_open_delay(Duration::from_millis(50));
        let manager = setup(&driver);

        let (first, second) = tokio::join!(manager.connect(), manager.connect());
        first.unwrap();
        second.unwrap();

        assert_eq!(driver.open_count(), 3);
        let main = manager.get_adapter("main").unwrap();
        for name in ["a", "b", "c"] {
            assert_eq!(
                main.get_connection(name).unwrap().status(),
                ConnectionStatus::Connected
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rename_during_fan_out() {
        let driver = ScriptedDriver::new("mongo").with_open_delay(Duration::from_millis(50));
        let manager = setup(&driver);
        let main = manager.get_adapter("main").unwrap();

        let rename = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            main.rename_connection("a", "primary").unwrap();
        };
        let (connected, ()) = tokio::join!(manager.connect(), rename);
        connected.unwrap();

        assert!(main.get_connection("a").is_none());
        assert!(main.is_connected("primary").unwrap());
        let names: Vec<String> = main.get_all_connections().keys().cloned().collect();
        assert_eq!(names, vec!["primary", "b", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_while_connecting() {
        let driver = ScriptedDriver::new("mongo").with_open_delay(Duration::from_millis(50));
        let manager = setup(&driver);
        let main = manager.get_adapter("main").unwrap();

        let (connected, removed) = tokio::join!(manager.connect(), main.remove_connection("b"));
        connected.unwrap();
        assert!(removed.unwrap());

        assert!(main.get_connection("b").is_none());
        assert_eq!(driver.open_handles(), 2);
    }
}

// 连接中间件集成测试
#[cfg(test)]
mod pipeline_tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use swiftdb_core::testing::ScriptedDriver;
    use swiftdb_core::{ConnectionParams, DriverError};
    use swiftdb_manager::{DbManager, PipelineFuture, Stack};

    #[derive(Debug, Default)]
    struct Request {
        path: String,
    }

    #[tokio::test]
    async fn test_connector_before_handler() {
        let driver = ScriptedDriver::new("mongo");
        let manager = Arc::new(DbManager::new());
        manager.register_kind(driver.shared()).unwrap();
        let adapter = manager.create_adapter("mongo", None).unwrap();
        adapter
            .create_connection(ConnectionParams::new("host/app"), None)
            .unwrap();

        let mut stack = Stack::new();
        stack.push(manager.connector());
        let shared = Arc::clone(&manager);
        let handler = stack.build(move |req: Request| -> PipelineFuture {
            let manager = Arc::clone(&shared);
            Box::pin(async move {
                assert_eq!(req.path, "/users");
                let adapter = manager.get_adapter("mongo_adapter_1").unwrap();
                assert!(adapter.is_connected("mongo_connection_1").unwrap());
                Ok(())
            })
        });

        handler
            .call(Request {
                path: "/users".to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_connector_failure_keeps_structured_error() {
        let driver = ScriptedDriver::new("mongo");
        driver.fail_open("down", DriverError::with_code("ETIMEDOUT", "down:27017"));
        let manager = Arc::new(DbManager::new());
        manager.register_kind(driver.shared()).unwrap();
        let adapter = manager.create_adapter("mongo", Some("main")).unwrap();
        adapter
            .create_connection(ConnectionParams::new("down/app"), Some("primary"))
            .unwrap();

        let reached = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&reached);
        let mut stack = Stack::new();
        stack.push(manager.connector());
        let handler = stack.build(move |_req: Request| -> PipelineFuture {
            flag.store(true, Ordering::SeqCst);
            Box::pin(async { Ok(()) })
        });

        let err = handler.call(Request::default()).await.unwrap_err();
        assert!(!reached.load(Ordering::SeqCst));
        assert_eq!(err.status, 500);
        assert_eq!(err.to_string(), "500 error connecting to database");

        let source = err.source.as_ref().unwrap();
        let only = &source.as_multi().unwrap().errors()[0];
        assert_eq!(only.connection_name(), Some("primary"));
        assert!(only.to_string().contains("ETIMEDOUT"));
    }
}
