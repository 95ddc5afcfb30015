use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Retcode {
    #[serde(rename = "retcode")]
    ret_code: i32,
    message: String,
}

impl Retcode {
    pub fn with_message(&self, msg: &str) -> Retcode {
        Retcode {
            ret_code: self.ret_code,
            message: format!("{}: {}", self.message, msg),
        }
    }

    pub fn code(&self) -> i32 {
        self.ret_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

lazy_static! {
    pub static ref OK: Retcode = Retcode {
        ret_code: 0,
        message: "ok".to_string(),
    };
    // Request Errors (10000-19999)
    pub static ref BAD_REQUEST: Retcode = Retcode {
        ret_code: 10001,
        message: "Bad Request".to_string(),
    };
    pub static ref UNKNOWN_TOOL: Retcode = Retcode {
        ret_code: 10002,
        message: "Unknown Tool".to_string(),
    };
    pub static ref RATE_LIMIT_EXCEEDED: Retcode = Retcode {
        ret_code: 10005,
        message: "Rate Limit Exceeded".to_string(),
    };
    pub static ref INVALID_ARGUMENT: Retcode = Retcode {
        ret_code: 10006,
        message: "Invalid Argument".to_string(),
    };

    // Unexpected Error
    pub static ref UNEXPECTED_ERROR: Retcode = Retcode {
        ret_code: 20001,
        message: "Unexpected Error".to_string(),
    };

    // Provider Errors (22000-22999)
    pub static ref PROVIDER_UNAVAILABLE: Retcode = Retcode {
        ret_code: 22001,
        message: "Provider Unavailable".to_string(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_message_keeps_code_and_prefixes_class() {
        let rc = INVALID_ARGUMENT.with_message("limit must be greater than 0");
        assert_eq!(rc.code(), 10006);
        assert_eq!(rc.message(), "Invalid Argument: limit must be greater than 0");
        // the shared constant is untouched
        assert_eq!(INVALID_ARGUMENT.message(), "Invalid Argument");
    }

    #[test]
    fn request_errors_share_a_band() {
        let codes: Vec<i32> = [&*BAD_REQUEST, &*UNKNOWN_TOOL, &*RATE_LIMIT_EXCEEDED, &*INVALID_ARGUMENT]
            .iter()
            .map(|rc| rc.code())
            .collect();
        assert_eq!(codes, vec![10001, 10002, 10005, 10006]);
    }
}
