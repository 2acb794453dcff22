use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{AuthError, Result};

use super::record::UserRecord;

/// 用户库：用户名 -> 用户记录，整体保存为一个 JSON 文件
pub struct UserStore {
    path: PathBuf,
    users: BTreeMap<String, UserRecord>,
}

impl UserStore {
    /// 从文件加载，文件不存在时为空库
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let users = if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| AuthError::storage(format!("读取用户库失败：{}", path.display()), e))?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).map_err(|e| {
                    AuthError::storage(format!("解析用户库失败：{}", path.display()), e)
                })?
            }
        } else {
            BTreeMap::new()
        };

        debug!("加载用户库 {}（{} 个用户）", path.display(), users.len());
        Ok(UserStore { path, users })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 整体重写到磁盘：先写临时文件再重命名，避免写一半的文件
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| AuthError::storage(format!("创建目录失败：{}", parent.display()), e))?;
            }
        }

        let content = serde_json::to_string_pretty(&self.users)
            .map_err(|e| AuthError::storage("序列化用户库失败", e))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, content)
            .map_err(|e| AuthError::storage(format!("写入临时文件失败：{}", tmp.display()), e))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| AuthError::storage(format!("替换用户库失败：{}", self.path.display()), e))?;

        Ok(())
    }

    pub fn contains(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    pub fn get(&self, username: &str) -> Option<&UserRecord> {
        self.users.get(username)
    }

    pub fn get_mut(&mut self, username: &str) -> Option<&mut UserRecord> {
        self.users.get_mut(username)
    }

    pub fn insert(&mut self, username: &str, record: UserRecord) -> Option<UserRecord> {
        self.users.insert(username.to_string(), record)
    }

    pub fn remove(&mut self, username: &str) -> Option<UserRecord> {
        self.users.remove(username)
    }

    /// 用户名列表（有序）
    pub fn usernames(&self) -> Vec<&str> {
        self.users.keys().map(String::as_str).collect()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = UserStore::load(dir.path().join("users_db.json")).unwrap();
        assert!(store.usernames().is_empty());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("users_db.json");

        let mut store = UserStore::load(&path).unwrap();
        store.insert("alice", UserRecord::new("pw", "alice@example.com"));
        store.save().unwrap();

        assert!(path.exists());
        assert!(!dir.path().join("data").join("users_db.json.tmp").exists());

        let reloaded = UserStore::load(&path).unwrap();
        assert_eq!(reloaded.get("alice"), store.get("alice"));
    }

    #[test]
    fn test_file_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users_db.json");

        let mut store = UserStore::load(&path).unwrap();
        store.insert("bob", UserRecord::new("pw", "bob@example.com"));
        store.save().unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let bob = &value["bob"];
        assert_eq!(bob["email"], "bob@example.com");
        assert!(bob["password_hash"].is_string());
        assert!(bob["created_at"].is_string());
        assert!(bob["last_login"].is_null());
    }

    #[test]
    fn test_corrupt_file_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users_db.json");
        fs::write(&path, "{ not json").unwrap();

        let err = UserStore::load(&path).err().unwrap();
        assert!(matches!(err, AuthError::Storage { .. }));
    }

    #[test]
    fn test_load_timestamps_without_offset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users_db.json");
        // 早期版本写出的时间不带时区
        fs::write(
            &path,
            r#"{
  "charlie": {
    "password_hash": "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
    "email": "charlie@example.com",
    "created_at": "2024-01-01T12:00:00.123456",
    "last_login": null
  },
  "dana": {
    "password_hash": "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
    "email": "dana@example.com",
    "created_at": "2024-01-01T12:00:00",
    "last_login": "2024-02-03T08:30:15.5"
  }
}"#,
        )
        .unwrap();

        let mut store = UserStore::load(&path).unwrap();
        let charlie = store.get("charlie").unwrap().clone();
        assert!(charlie.verify_password("abc"));
        assert!(charlie.last_login.is_none());
        let dana = store.get("dana").unwrap().clone();
        assert!(dana.last_login.unwrap() > dana.created_at);

        // 重新保存后改为 RFC 3339，再次加载结果不变
        store.save().unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let created_at = value["charlie"]["created_at"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(created_at).is_ok());

        let reloaded = UserStore::load(&path).unwrap();
        assert_eq!(reloaded.get("charlie"), Some(&charlie));
        assert_eq!(reloaded.get("dana"), Some(&dana));
    }

    #[test]
    fn test_usernames_sorted() {
        let dir = TempDir::new().unwrap();
        let mut store = UserStore::load(dir.path().join("u.json")).unwrap();
        store.insert("zed", UserRecord::new("pw", "z@example.com"));
        store.insert("amy", UserRecord::new("pw", "a@example.com"));
        assert_eq!(store.usernames(), vec!["amy", "zed"]);
    }
}
