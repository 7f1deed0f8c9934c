use std::path::PathBuf;
use std::sync::OnceLock;

static ROOT_DIR: OnceLock<PathBuf> = OnceLock::new();

/// 设置存储层的数据根目录。
///
/// # Logic
/// 1. 将路径写入进程级静态变量，数据库文件将创建在该目录下。
/// 2. 只有首次设置生效，之后的调用不改变已生效的目录。
///
/// # Arguments
/// * `path` - 存储数据的根目录路径。
///
/// # Returns
/// * None
pub fn set_root_dir(path: PathBuf) {
    let _ = ROOT_DIR.set(path);
}

/// 获取当前配置的数据根目录，未设置时退回默认的 "data"。
pub(crate) fn get_root_dir() -> PathBuf {
    ROOT_DIR
        .get()
        .cloned()
        .unwrap_or_else(|| PathBuf::from("data"))
}
