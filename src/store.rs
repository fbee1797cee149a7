//! 时间戳记录存储 - 键寻址、last-write-wins 的持久化

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// 最新导出时间戳记录的固定键
pub const LATEST_EXPORT_TIMESTAMP_ID: &str = "latest-export-timestamp";

/// 时间戳记录
///
/// 清理状态触发时写入，同键覆盖旧值，本组件只写不读。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampRecord {
    /// 记录键
    pub id: String,
    /// 类型区分符（来自配置）
    #[serde(rename = "type")]
    pub record_type: String,
    /// 触发事件携带的导出时间戳（epoch 毫秒）
    #[serde(rename = "latestExportTimestamp")]
    pub latest_export_timestamp: i64,
}

/// 记录存储 trait
///
/// 单条写入由存储自身保证原子性；失败向上传播。
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// 按键 upsert 一条记录
    async fn put(&self, record: &TimestampRecord) -> Result<()>;
}

/// 文件记录存储 - 每个表一个 JSON 对象文件，键为记录 id
pub struct FileRecordStore {
    path: PathBuf,
}

impl FileRecordStore {
    /// 按表名创建存储
    ///
    /// 含路径分隔符的表名按文件路径使用；
    /// 裸表名落在 ~/.config/workflow-message-broker/<表名>.json。
    pub fn new(table_name: &str) -> Self {
        let path = if table_name.contains(std::path::MAIN_SEPARATOR) {
            PathBuf::from(table_name)
        } else {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config")
                .join("workflow-message-broker")
                .join(format!("{}.json", table_name))
        };
        Self { path }
    }

    /// 存储文件路径
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn put_sync(&self, record: &TimestampRecord) -> Result<()> {
        use fs2::FileExt;

        // 确保目录存在
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        // 打开表文件并加锁，读-改-写期间独占
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        file.lock_exclusive()?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let mut table: BTreeMap<String, TimestampRecord> = if contents.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_str(&contents)
                .with_context(|| format!("Corrupt record table {}", self.path.display()))?
        };

        table.insert(record.id.clone(), record.clone());

        // 写入临时文件后原子替换
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, serde_json::to_string_pretty(&table)?)?;
        fs::rename(&temp_path, &self.path)?;

        file.unlock()?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn put(&self, record: &TimestampRecord) -> Result<()> {
        self.put_sync(record)?;
        debug!(
            table = %self.path.display(),
            id = %record.id,
            "Timestamp record written"
        );
        Ok(())
    }
}
