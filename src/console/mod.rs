//! Console ingress.
//!
//! A line-oriented listener on stdin. It carries the full command set so an
//! operator at the terminal can drive the service without any chat platform
//! attached; commands act with the authority of the super-operator.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::notify::LogNotifier;
use crate::service::ControlService;

const HELP: &str = "\
commands:
  /op @user | /unop @user            operator rank
  /promote @user | /demote @user     global-admin rank
  /ladmin @user <bot> | /unladmin @user <bot>
  /ban @user [hours] [reason]        hours 0 or omitted = permanent
  /unban @user
  /warn @user [reason] | /unwarn @user
  /getinfo @user
  /adduser <id> @user <name>
  /addbot <name> [@botusername] [kind] | /removebot <name>
  /startbot <name> | /stopbot <name> | /botstatus <name> | /botlist
  /list <operator|gadmin|ladmin|ban>
  /alarm <message>
  /authcode @user | /redeem <code>
  /stats | /help";

/// Read console commands until stdin closes.
pub async fn run(service: Arc<ControlService>, super_operator: String) {
    println!("console ready; /help for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = handle(&service, &super_operator, line).await;
        println!("{}", reply);
    }

    info!("console input closed");
}

async fn handle(service: &ControlService, issuer: &str, line: &str) -> String {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let command = parts[0];
    let arg = |i: usize| parts.get(i).copied().unwrap_or_default();
    let rest = |i: usize| parts.get(i..).map(|s| s.join(" ")).unwrap_or_default();

    let reply = match command {
        "/op" => service.promote_operator(issuer, arg(1)).await,
        "/unop" => service.demote_operator(issuer, arg(1)).await,
        "/promote" => service.promote_global_admin(issuer, arg(1)).await,
        "/demote" => service.demote_global_admin(issuer, arg(1)).await,
        "/ladmin" => service.assign_local_admin(issuer, arg(1), arg(2)).await,
        "/unladmin" => service.revoke_local_admin(issuer, arg(1), arg(2)).await,
        "/ban" => {
            // Second token is an optional duration; everything after is
            // the reason either way.
            let (hours, reason_from) = match arg(2).parse::<u32>() {
                Ok(hours) => (hours, 3),
                Err(_) => (0, 2),
            };
            service.ban(issuer, arg(1), hours, &rest(reason_from)).await
        }
        "/unban" => service.unban(issuer, arg(1)).await,
        "/warn" => service.warn(issuer, arg(1), &rest(2)).await,
        "/unwarn" => service.unwarn(issuer, arg(1)).await,
        "/getinfo" => service.user_info(issuer, arg(1)).await,
        "/adduser" => match arg(1).parse::<i64>() {
            Ok(user_id) => service.register_user(user_id, arg(2), &rest(3)).await,
            Err(_) => return "usage: /adduser <id> @user <name>".to_string(),
        },
        "/addbot" => {
            let bot_username = parts.get(2).map(|s| s.trim_start_matches('@').to_string());
            service.add_bot(issuer, arg(1), bot_username, arg(3)).await
        }
        "/removebot" => service.remove_bot(issuer, arg(1)).await,
        "/startbot" => service.start_bot(issuer, arg(1)).await,
        "/stopbot" => service.stop_bot(issuer, arg(1)).await,
        "/botstatus" => service.bot_status(issuer, arg(1)).await,
        "/botlist" => service.list_bots(issuer).await,
        "/list" => service.list_members(issuer, arg(1)).await,
        "/alarm" => service.broadcast(issuer, &rest(1), &LogNotifier).await,
        "/authcode" => service.issue_auth_code(issuer, arg(1)).await,
        "/redeem" => service.redeem_auth_code(arg(1)).await,
        "/stats" => service.stats(issuer).await,
        "/help" => return HELP.to_string(),
        _ => return "unknown command; /help lists the available ones".to_string(),
    };

    if reply.ok {
        info!("console: {}", reply.message);
    }
    reply.message
}
