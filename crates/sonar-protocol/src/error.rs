//! 协议层错误类型定义

use thiserror::Error;

/// 数据模型校验错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// 无效的档位值
    #[error("Invalid gear selector: {value}")]
    InvalidGear { value: i8 },

    /// 无效的运动段参数
    #[error("Invalid maneuver profile: {reason}")]
    InvalidProfile { reason: String },

    /// 传感器标识重复
    #[error("Duplicate sensor identifier: {id}")]
    DuplicateSensor { id: String },

    /// 无效的传感器描述
    #[error("Invalid sensor descriptor '{id}': {reason}")]
    InvalidSensor { id: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::InvalidGear { value: 7 };
        assert_eq!(format!("{}", err), "Invalid gear selector: 7");

        let err = ProtocolError::DuplicateSensor {
            id: "front left".to_string(),
        };
        assert!(format!("{}", err).contains("front left"));
    }
}
