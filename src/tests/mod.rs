mod dispatch_flow_test;
