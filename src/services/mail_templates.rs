use crate::services::mailer::OutboundEmail;

pub fn signup_verification(to: &str, public_url: &str, token: &str) -> OutboundEmail {
    let link = format!("{}/api/users/signup/verification/{}", public_url, token);

    OutboundEmail {
        to: to.to_string(),
        subject: "Confirm your Canvas account".to_string(),
        body: format!(
            "Hello,\n\n\
             Thanks for signing up. Please confirm your email address by opening the link below:\n\n\
             {}\n\n\
             This link expires in 6 hours. If you did not sign up, you can ignore this email.\n",
            link
        ),
    }
}

pub fn email_change_verification(to: &str, public_url: &str, token: &str) -> OutboundEmail {
    let link = format!("{}/api/users/email/change/verification/{}", public_url, token);

    OutboundEmail {
        to: to.to_string(),
        subject: "Confirm your new email address".to_string(),
        body: format!(
            "Hello,\n\n\
             A request was made to use this address for a Canvas account.\n\
             Sign in and open the link below to confirm the change:\n\n\
             {}\n\n\
             If you did not request this, you can ignore this email.\n",
            link
        ),
    }
}

pub fn password_reset(to: &str, public_url: &str, token: &str) -> OutboundEmail {
    let link = format!("{}/api/users/password/reset/verification/{}", public_url, token);

    OutboundEmail {
        to: to.to_string(),
        subject: "Reset your Canvas password".to_string(),
        body: format!(
            "Hello,\n\n\
             You asked to reset your password. Choose a new one using the link below:\n\n\
             {}\n\n\
             If you did not ask for this, your password is unchanged.\n",
            link
        ),
    }
}
