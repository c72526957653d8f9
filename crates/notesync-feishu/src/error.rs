//! Table-service error codes.
//!
//! Non-zero envelope codes are translated into actionable messages. Known
//! codes have a fixed text; unknown codes fall back to a message chosen by
//! the numeric range the code belongs to.

use notesync_core::Error;

/// Extra hint appended to the datetime-format error.
const DATETIME_HINT: &str =
    "\n建议：请检查发布时间和更新时间字段是否为有效的Unix时间戳格式。如果问题持续，请尝试重新获取笔记数据。";

/// Extra hint appended to the hyperlink-format error.
const LINK_HINT: &str = "\n建议：链接字段需要包含text和link属性的对象，例如：{\"text\": \"笔记标题\", \"link\": \"https://example.com\"}。系统已自动修复此问题，请重新尝试同步。";

/// Fixed message for a known code.
fn known_message(code: i64) -> Option<&'static str> {
    let msg = match code {
        // Authentication
        99991661 => "应用权限不足，请检查应用权限配置",
        99991662 => "token 无效或已过期，请重新获取",
        99991663 => "app_id 参数无效，请检查应用配置",
        99991664 => "app_secret 参数无效，请检查应用配置",
        99991665 => "应用不存在或已被删除",
        99991666 => "应用状态异常，请联系管理员",

        // Request
        1254000 => "请求体格式错误，请检查JSON格式",
        1254001 => "请求体参数错误，请检查必填参数",
        1254002 => "内部错误，请稍后重试或联系技术支持",
        1254003 => "app_token错误，请检查多维表格链接",
        1254031 => "多维表格名称格式错误，长度不能超过255个字符",
        1254036 => "多维表格正在复制中，请稍后重试",
        1254040 => "app_token不存在，请检查多维表格是否有效",
        1254045 => "字段不存在，系统已自动创建缺失字段，请重试同步",
        1254046 => "字段类型不支持",
        1254047 => "字段名称重复",
        1254048 => "字段数量超过限制",
        1254050 => "记录不存在",
        1254051 => "记录数量超过限制",
        1254052 => "记录字段值格式错误",
        1254064 => "日期时间字段格式错误，需要Unix时间戳格式",
        1254068 => "链接字段格式错误，需要包含text和link属性的对象格式",

        // Rate limiting and concurrency
        1254290 => "请求过于频繁，请稍后重试",
        1254291 => "存在并发写操作冲突，请稍后重试",

        // Permissions
        1254301 => "多维表格未开启高级权限或不支持开启高级权限",
        1254302 => "无访问权限，可能是表格开启了高级权限，请在高级权限设置中添加应用权限",

        // Cloud space
        1254701 => "对目标云空间节点没有权限",
        1254702 => "云空间节点不存在",

        _ => return None,
    };
    Some(msg)
}

/// Translate an envelope code (and the service's own `msg`) into the text
/// shown to the user.
pub fn map_error_code(code: i64, msg: Option<&str>) -> String {
    if let Some(known) = known_message(code) {
        let hint = match code {
            1254064 => DATETIME_HINT,
            1254068 => LINK_HINT,
            _ => "",
        };
        return format!("{} (错误码: {}){}", known, code, hint);
    }

    let msg = msg.map(str::trim).filter(|m| !m.is_empty());
    let (category, fallback) = match code {
        99991660..=99991670 => ("认证失败", "请检查App ID和App Secret配置"),
        1254000..=1254099 => ("请求参数错误", "请检查请求参数格式"),
        1254200..=1254299 => ("业务逻辑错误", "请检查业务逻辑"),
        1254300..=1254399 => ("权限错误", "请检查应用权限设置"),
        1254700..=1254799 => ("云空间错误", "请检查云空间权限"),
        _ => ("飞书API错误", "未知错误"),
    };
    format!("{} ({}): {}", category, code, msg.unwrap_or(fallback))
}

/// Build the protocol error for a non-zero envelope.
pub fn api_error(code: i64, msg: Option<&str>) -> Error {
    Error::Api {
        code,
        message: map_error_code(code, msg),
    }
}

/// Prefix an error with the step that produced it, keeping its kind.
pub fn with_context(err: Error, context: &str) -> Error {
    match err {
        Error::Api { code, message } => Error::Api {
            code,
            message: format!("{}: {}", context, message),
        },
        Error::Request(msg) => Error::Request(format!("{}: {}", context, msg)),
        Error::Timeout(msg) => Error::Timeout(format!("{}: {}", context, msg)),
        other => Error::Internal(format!("{}: {}", context, other)),
    }
}
