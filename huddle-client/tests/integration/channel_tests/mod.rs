mod test_channel_dispatch;
mod test_channel_reconnect;
mod test_join_on_open;
