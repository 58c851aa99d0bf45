//! PostgreSQL, based on the [bitnami/postgresql](https://github.com/bitnami/charts/tree/master/bitnami/postgresql)
//! chart.
//!
//! ```
//! use kloudlib::{
//!     components::postgresql::{PostgreSql, PostgreSqlArgs},
//!     password::RandomPasswordGenerator,
//! };
//!
//! let pg = PostgreSql::new("pg", PostgreSqlArgs::default(), &RandomPasswordGenerator);
//!
//! assert_eq!(pg.host, "pg-postgresql");
//! assert_eq!(pg.read_replicas_host, "pg-postgresql-read");
//! assert_eq!(pg.port, 5432);
//! ```
use educe::Educe;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use crate::{
    commons::{Chart, ComputeResources, HelmMeta, Persistence},
    components::PersistenceValues,
    password::{DEFAULT_PASSWORD_LENGTH, PasswordGenerator},
    pipeline::Pipeline,
    transformation::{ReplaceApiVersion, SkipAwaitWithoutReplicas},
};

pub const CHART_NAME: &str = "postgresql";
pub const DEFAULT_CHART_VERSION: &str = "8.6.13";
pub const CHART_REPO: &str = "https://charts.bitnami.com/bitnami";

pub const DEFAULT_PORT: u16 = 5432;
pub const DEFAULT_USERNAME: &str = "postgres";
pub const DEFAULT_DATABASE: &str = "postgres";
pub const REPLICATION_USER: &str = "repl_user";

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to serialize chart values for {name:?}"))]
    SerializeValues {
        source: serde_json::Error,
        name: String,
    },
}

/// The name of the service in front of the primary instance.
pub fn primary_service_name(release_name: &str) -> String {
    format!("{release_name}-{CHART_NAME}")
}

/// The name of the service in front of the read replicas. The chart creates it even if there
/// are no read replicas.
pub fn read_service_name(release_name: &str) -> String {
    format!("{release_name}-{CHART_NAME}-read")
}

#[derive(Clone, Default, Deserialize, Educe, PartialEq, Eq)]
#[educe(Debug)]
#[serde(rename_all = "camelCase")]
pub struct PostgreSqlArgs {
    /// Overrides the namespace of the rendered objects.
    pub namespace: Option<String>,

    /// The chart version, defaults to [`DEFAULT_CHART_VERSION`].
    pub version: Option<String>,

    /// The admin user, defaults to [`DEFAULT_USERNAME`].
    pub username: Option<String>,

    /// The admin password, generated if not set.
    #[educe(Debug(ignore))]
    pub password: Option<String>,

    /// The database name, defaults to [`DEFAULT_DATABASE`].
    pub database: Option<String>,

    #[serde(default)]
    pub replication: Replication,

    #[serde(default)]
    pub metrics: Metrics,

    pub persistence: Option<Persistence>,
    pub resources: Option<ComputeResources>,
}

/// Read replica configuration.
#[derive(Clone, Default, Deserialize, Educe, PartialEq, Eq)]
#[educe(Debug)]
#[serde(rename_all = "camelCase", default)]
pub struct Replication {
    /// The number of read replicas.
    pub replicas: u32,

    pub synchronous_commit: SynchronousCommit,

    /// The number of replicas using synchronous replication.
    pub num_synchronous_replicas: u32,

    /// The password of the replication user, generated if not set.
    #[educe(Debug(ignore))]
    pub replication_password: Option<String>,
}

/// The `synchronous_commit` mode of the primary.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SynchronousCommit {
    On,
    RemoteApply,
    RemoteWrite,
    Local,
    #[default]
    Off,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct Metrics {
    /// Deploys a Prometheus exporter next to the database.
    pub enabled: Option<bool>,
}

/// Connection strings to the primary instance.
#[derive(Clone, Educe, PartialEq, Eq)]
#[educe(Debug)]
pub struct ConnectionStrings {
    #[educe(Debug(ignore))]
    pub uri: String,

    #[educe(Debug(ignore))]
    pub dotnet: String,
}

/// A PostgreSQL deployment with replication enabled and a configurable number of read replicas.
///
/// Replication is always on: the chart deploys an entirely different primary StatefulSet
/// depending on that flag, so toggling it later would replace the running database. With zero
/// read replicas this still behaves as a single instance.
#[derive(Clone, Educe)]
#[educe(Debug)]
pub struct PostgreSql {
    pub name: String,
    pub meta: HelmMeta,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,

    #[educe(Debug(ignore))]
    pub password: String,

    pub read_replicas_host: String,
    pub read_replicas_port: u16,

    #[educe(Debug(ignore))]
    pub replication_password: String,

    pub connection_strings: ConnectionStrings,

    args: PostgreSqlArgs,
}

impl PostgreSql {
    pub fn new(name: &str, args: PostgreSqlArgs, passwords: &impl PasswordGenerator) -> Self {
        let host = primary_service_name(name);
        let port = DEFAULT_PORT;
        let database = args
            .database
            .clone()
            .unwrap_or_else(|| DEFAULT_DATABASE.to_owned());
        let username = args
            .username
            .clone()
            .unwrap_or_else(|| DEFAULT_USERNAME.to_owned());
        let password = args
            .password
            .clone()
            .unwrap_or_else(|| passwords.generate(DEFAULT_PASSWORD_LENGTH));
        let replication_password = args
            .replication
            .replication_password
            .clone()
            .unwrap_or_else(|| passwords.generate(DEFAULT_PASSWORD_LENGTH));

        let connection_strings = ConnectionStrings {
            uri: format!(
                "postgresql://{username}:{password}@{host}:{port}/{database}?sslmode=disable"
            ),
            dotnet: format!(
                "Host={host};Port={port};Database={database};Username={username};Password={password};SSL Mode=Disable"
            ),
        };

        let meta = HelmMeta {
            chart: CHART_NAME.to_owned(),
            version: args
                .version
                .clone()
                .unwrap_or_else(|| DEFAULT_CHART_VERSION.to_owned()),
            repo: CHART_REPO.to_owned(),
        };

        tracing::debug!(name, %host, version = %meta.version, "assembled postgresql component");

        Self {
            name: name.to_owned(),
            meta,
            host,
            port,
            database,
            username,
            password,
            read_replicas_host: read_service_name(name),
            read_replicas_port: DEFAULT_PORT,
            replication_password,
            connection_strings,
            args,
        }
    }

    /// The chart values.
    pub fn values(&self) -> Result<serde_json::Value, Error> {
        let replication = &self.args.replication;
        let values = Values {
            global: GlobalValues {
                postgresql: GlobalPostgresqlValues {
                    postgresql_username: &self.username,
                    postgresql_password: &self.password,
                    postgresql_database: &self.database,
                    replication_password: &self.replication_password,
                },
            },
            replication: ReplicationValues {
                enabled: true,
                user: REPLICATION_USER,
                password: &self.replication_password,
                slave_replicas: replication.replicas,
                synchronous_commit: replication.synchronous_commit,
                num_synchronous_replicas: replication.num_synchronous_replicas,
            },
            metrics: MetricsValues {
                enabled: self.args.metrics.enabled,
            },
            persistence: self
                .args
                .persistence
                .as_ref()
                .map(PersistenceValues::from)
                .unwrap_or_default(),
            resources: self.args.resources.as_ref(),
        };

        serde_json::to_value(values).with_context(|_| SerializeValuesSnafu {
            name: self.name.clone(),
        })
    }

    /// The rules to run over the rendered chart.
    pub fn transformations(&self) -> Pipeline {
        Pipeline::new()
            .with(ReplaceApiVersion::new(
                "StatefulSet",
                "apps/v1beta2",
                "apps/v1",
            ))
            .with(SkipAwaitWithoutReplicas::postgresql_read(
                &self.name,
                self.args.replication.replicas,
            ))
    }

    pub fn chart(&self) -> Result<Chart, Error> {
        Ok(Chart {
            release_name: self.name.clone(),
            namespace: self.args.namespace.clone(),
            meta: self.meta.clone(),
            values: self.values()?,
        })
    }
}

#[derive(Serialize)]
struct Values<'a> {
    global: GlobalValues<'a>,
    replication: ReplicationValues<'a>,
    metrics: MetricsValues,
    persistence: PersistenceValues<'a>,

    #[serde(skip_serializing_if = "Option::is_none")]
    resources: Option<&'a ComputeResources>,
}

#[derive(Serialize)]
struct GlobalValues<'a> {
    postgresql: GlobalPostgresqlValues<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GlobalPostgresqlValues<'a> {
    postgresql_username: &'a str,
    postgresql_password: &'a str,
    postgresql_database: &'a str,
    replication_password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplicationValues<'a> {
    enabled: bool,
    user: &'a str,
    password: &'a str,
    slave_replicas: u32,
    synchronous_commit: SynchronousCommit,
    num_synchronous_replicas: u32,
}

#[derive(Serialize)]
struct MetricsValues {
    #[serde(skip_serializing_if = "Option::is_none")]
    enabled: Option<bool>,
}
